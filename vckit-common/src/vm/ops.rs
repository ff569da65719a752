use anyhow::Result;
use tracing::info;

use crate::error::VcError;
use crate::vsphere::{PowerState, VmSummary};

/// Operations the delete flow needs from the virtualization platform.
#[allow(async_fn_in_trait)]
pub trait VmProvider {
    async fn find_vm(&self, name: &str) -> Result<Option<VmSummary>>;
    async fn power_off(&self, vm_id: &str) -> Result<()>;
    async fn destroy(&self, vm_id: &str) -> Result<()>;
}

/// Node and client records kept for a machine on the configuration-management
/// registry.
#[allow(async_fn_in_trait)]
pub trait RecordStore {
    async fn delete_node(&self, name: &str) -> Result<()>;
    async fn delete_client(&self, name: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct DeleteOptions {
    pub name: String,
    /// Also delete the node and client records from the registry.
    pub purge: bool,
    /// Record name used for the purge; defaults to the VM name.
    pub node_name: Option<String>,
}

/// What the flow actually did, for the CLI to report. Keeping this a value
/// (instead of printing or exiting here) keeps the flow unit-testable.
#[derive(Debug)]
pub struct DeleteReport {
    pub name: String,
    pub powered_off: bool,
    /// Record name deleted from the registry, when `--purge` was given.
    pub purged: Option<String>,
}

/// Power off (if needed) and destroy a named VM, optionally purging its
/// registry records.
///
/// The VM is resolved by name first; an unknown name fails with
/// [`VcError::NotFound`] before anything is touched. Suspended VMs are
/// powered off like running ones. Registry records are deleted after the VM
/// is gone, node first, then client, both keyed by the same name.
#[tracing::instrument(name = "vm.delete", skip(provider, records), fields(vm = %opts.name))]
pub async fn delete_vm_flow<P: VmProvider, R: RecordStore>(
    provider: &P,
    records: &R,
    opts: &DeleteOptions,
) -> Result<DeleteReport, VcError> {
    let vm = provider
        .find_vm(&opts.name)
        .await?
        .ok_or_else(|| VcError::NotFound {
            name: opts.name.clone(),
        })?;

    let powered_off = if vm.power_state == PowerState::PoweredOff {
        false
    } else {
        info!("Powering off VM {} ({})", vm.name, vm.vm);
        provider.power_off(&vm.vm).await?;
        true
    };

    provider.destroy(&vm.vm).await?;
    info!("Deleted virtual machine {}", vm.name);

    let purged = if opts.purge {
        let record = opts.node_name.clone().unwrap_or_else(|| opts.name.clone());
        records.delete_node(&record).await?;
        records.delete_client(&record).await?;
        Some(record)
    } else {
        None
    };

    Ok(DeleteReport {
        name: opts.name.clone(),
        powered_off,
        purged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::cell::RefCell;
    use std::rc::Rc;

    type CallLog = Rc<RefCell<Vec<String>>>;

    struct MockProvider {
        vm: Option<VmSummary>,
        log: CallLog,
    }

    impl VmProvider for MockProvider {
        async fn find_vm(&self, name: &str) -> Result<Option<VmSummary>> {
            self.log.borrow_mut().push(format!("find {name}"));
            Ok(self.vm.clone())
        }

        async fn power_off(&self, vm_id: &str) -> Result<()> {
            self.log.borrow_mut().push(format!("power_off {vm_id}"));
            Ok(())
        }

        async fn destroy(&self, vm_id: &str) -> Result<()> {
            self.log.borrow_mut().push(format!("destroy {vm_id}"));
            Ok(())
        }
    }

    struct MockRecords {
        log: CallLog,
        fail: bool,
    }

    impl RecordStore for MockRecords {
        async fn delete_node(&self, name: &str) -> Result<()> {
            if self.fail {
                return Err(anyhow!("node {name} does not exist"));
            }
            self.log.borrow_mut().push(format!("delete_node {name}"));
            Ok(())
        }

        async fn delete_client(&self, name: &str) -> Result<()> {
            self.log.borrow_mut().push(format!("delete_client {name}"));
            Ok(())
        }
    }

    fn running_vm() -> VmSummary {
        VmSummary {
            vm: "vm-42".to_string(),
            name: "web01".to_string(),
            power_state: PowerState::PoweredOn,
        }
    }

    fn harness(vm: Option<VmSummary>) -> (MockProvider, MockRecords, CallLog) {
        let log: CallLog = Rc::new(RefCell::new(Vec::new()));
        let provider = MockProvider {
            vm,
            log: Rc::clone(&log),
        };
        let records = MockRecords {
            log: Rc::clone(&log),
            fail: false,
        };
        (provider, records, log)
    }

    fn opts(name: &str) -> DeleteOptions {
        DeleteOptions {
            name: name.to_string(),
            purge: false,
            node_name: None,
        }
    }

    #[tokio::test]
    async fn test_running_vm_is_powered_off_before_destroy() {
        let (provider, records, log) = harness(Some(running_vm()));

        let report = delete_vm_flow(&provider, &records, &opts("web01"))
            .await
            .unwrap();

        assert!(report.powered_off);
        assert!(report.purged.is_none());
        assert_eq!(
            *log.borrow(),
            vec!["find web01", "power_off vm-42", "destroy vm-42"]
        );
    }

    #[tokio::test]
    async fn test_powered_off_vm_skips_power_off() {
        let vm = VmSummary {
            power_state: PowerState::PoweredOff,
            ..running_vm()
        };
        let (provider, records, log) = harness(Some(vm));

        let report = delete_vm_flow(&provider, &records, &opts("web01"))
            .await
            .unwrap();

        assert!(!report.powered_off);
        assert_eq!(*log.borrow(), vec!["find web01", "destroy vm-42"]);
    }

    #[tokio::test]
    async fn test_purge_defaults_record_name_to_vm_name() {
        let (provider, records, log) = harness(Some(running_vm()));

        let report = delete_vm_flow(
            &provider,
            &records,
            &DeleteOptions {
                purge: true,
                ..opts("web01")
            },
        )
        .await
        .unwrap();

        assert_eq!(report.purged.as_deref(), Some("web01"));
        assert_eq!(
            *log.borrow(),
            vec![
                "find web01",
                "power_off vm-42",
                "destroy vm-42",
                "delete_node web01",
                "delete_client web01",
            ]
        );
    }

    #[tokio::test]
    async fn test_purge_honors_node_name_override() {
        let (provider, records, log) = harness(Some(running_vm()));

        let report = delete_vm_flow(
            &provider,
            &records,
            &DeleteOptions {
                purge: true,
                node_name: Some("web01.prod".to_string()),
                ..opts("web01")
            },
        )
        .await
        .unwrap();

        assert_eq!(report.purged.as_deref(), Some("web01.prod"));
        assert!(log.borrow().contains(&"delete_node web01.prod".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_vm_fails_before_any_mutation() {
        let (provider, records, log) = harness(None);

        let err = delete_vm_flow(&provider, &records, &opts("ghost"))
            .await
            .unwrap_err();

        assert!(matches!(err, VcError::NotFound { ref name } if name == "ghost"));
        assert_eq!(*log.borrow(), vec!["find ghost"]);
    }

    #[tokio::test]
    async fn test_registry_failure_propagates_after_vm_deletion() {
        let log: CallLog = Rc::new(RefCell::new(Vec::new()));
        let provider = MockProvider {
            vm: Some(running_vm()),
            log: Rc::clone(&log),
        };
        let records = MockRecords {
            log: Rc::clone(&log),
            fail: true,
        };

        let err = delete_vm_flow(
            &provider,
            &records,
            &DeleteOptions {
                purge: true,
                ..opts("web01")
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, VcError::Api(_)));
        // The VM itself was already destroyed when the purge failed.
        assert!(log.borrow().contains(&"destroy vm-42".to_string()));
    }
}
