//! The action dispatch router.
//!
//! Receives a batch on the Slave side, resolves installed adapters per
//! `(product, tool, action)` and invokes each one, isolating failures so a
//! broken adapter never prevents the rest of the batch from running.

use tracing::{debug, warn};

use crate::types::{ActionId, ProductId, ToolId};

use super::registry::RegistrationSet;
use super::{ActionBatch, AdapterInvocation, AdapterResolver};

/// An action skipped because no adapter is installed for it. A normal,
/// non-error outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedAction {
    /// `None` when no installed product carries the tool at all.
    pub product: Option<ProductId>,
    pub tool: ToolId,
    pub action: ActionId,
}

/// One failed adapter invocation, reported once, never retried.
#[derive(Debug)]
pub struct DispatchFailure {
    pub product: ProductId,
    pub tool: ToolId,
    pub action: ActionId,
    pub error: anyhow::Error,
}

/// Aggregate outcome of one dispatch call. Partial success is the expected
/// steady state: the batch always runs to completion before failures are
/// reported.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Adapter invocations actually attempted.
    pub attempted: usize,
    pub errors: Vec<DispatchFailure>,
    pub skipped: Vec<SkippedAction>,
}

impl DispatchReport {
    /// The call as a whole failed iff any adapter invocation failed.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Slave-side dispatch entry point.
pub struct Router<'a> {
    registrations: RegistrationSet,
    resolver: &'a dyn AdapterResolver,
}

impl<'a> Router<'a> {
    pub fn new(registrations: RegistrationSet, resolver: &'a dyn AdapterResolver) -> Self {
        Self {
            registrations,
            resolver,
        }
    }

    /// Dispatch every envelope in the batch. No early abort, no retries;
    /// adapter failures are collected and reported in aggregate.
    pub fn dispatch(&self, user_id: &str, batch: &ActionBatch) -> DispatchReport {
        let mut report = DispatchReport::default();

        for (tool, envelopes) in batch.groups() {
            let products = self.registrations.products_for(*tool);
            if products.is_empty() {
                for envelope in envelopes {
                    warn!(
                        tool = %tool,
                        action = %envelope.action,
                        "no product carries this tool here, action skipped"
                    );
                    report.skipped.push(SkippedAction {
                        product: None,
                        tool: *tool,
                        action: envelope.action.clone(),
                    });
                }
                continue;
            }

            for product in products {
                for envelope in envelopes {
                    match self.registrations.lookup(product, *tool, &envelope.action) {
                        None => {
                            warn!(
                                product = %product,
                                tool = %tool,
                                action = %envelope.action,
                                "adapter not installed, action skipped"
                            );
                            report.skipped.push(SkippedAction {
                                product: Some(product.clone()),
                                tool: *tool,
                                action: envelope.action.clone(),
                            });
                        }
                        Some(registration) => {
                            report.attempted += 1;

                            // Product-level parameters prepended, action
                            // parameters appended; the order is part of each
                            // action's contract.
                            let mut arguments = registration.product_parameters.clone();
                            arguments.extend(envelope.parameters.iter().cloned());

                            let invocation = AdapterInvocation {
                                user_id,
                                arguments: &arguments,
                            };

                            let result = match self.resolver.resolve(registration) {
                                Some(adapter) => adapter.apply(&invocation),
                                None => Err(anyhow::anyhow!(
                                    "registered adapter implementation could not be loaded"
                                )),
                            };

                            match result {
                                Ok(()) => debug!(
                                    product = %product,
                                    tool = %tool,
                                    action = %envelope.action,
                                    "action applied"
                                ),
                                Err(error) => {
                                    warn!(
                                        product = %product,
                                        tool = %tool,
                                        action = %envelope.action,
                                        %error,
                                        "adapter invocation failed"
                                    );
                                    report.errors.push(DispatchFailure {
                                        product: product.clone(),
                                        tool: *tool,
                                        action: envelope.action.clone(),
                                        error,
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::dispatch::registry::AdapterRegistration;
    use crate::dispatch::{Adapter, StaticResolver};
    use crate::transport::BatchBuilder;

    type InvocationLog = Arc<Mutex<Vec<Vec<String>>>>;

    /// Appends every invocation to a shared log; fails when told to.
    struct Probe {
        log: InvocationLog,
        fail: bool,
    }

    impl Probe {
        fn new(log: InvocationLog, fail: bool) -> Box<Self> {
            Box::new(Self { log, fail })
        }
    }

    impl Adapter for Probe {
        fn apply(&self, invocation: &AdapterInvocation<'_>) -> anyhow::Result<()> {
            let mut entry = vec![invocation.user_id.to_string()];
            entry.extend(invocation.arguments.iter().cloned());
            self.log.lock().unwrap().push(entry);
            if self.fail {
                anyhow::bail!("adapter exploded");
            }
            Ok(())
        }
    }

    fn registration(action: &str) -> AdapterRegistration {
        AdapterRegistration::new(
            ProductId::new("Trac"),
            ToolId::TicketTracker,
            ActionId::new(action),
        )
    }

    #[test]
    fn test_failure_isolation_runs_whole_batch() {
        let mut registrations = RegistrationSet::default();
        for action in ["First", "Second", "Third"] {
            registrations.record(registration(action));
        }

        let log: InvocationLog = Arc::default();
        let resolver = StaticResolver::new()
            .register(
                ProductId::new("Trac"),
                ToolId::TicketTracker,
                ActionId::new("First"),
                Probe::new(log.clone(), false),
            )
            .register(
                ProductId::new("Trac"),
                ToolId::TicketTracker,
                ActionId::new("Second"),
                Probe::new(log.clone(), true),
            )
            .register(
                ProductId::new("Trac"),
                ToolId::TicketTracker,
                ActionId::new("Third"),
                Probe::new(log.clone(), false),
            );

        let batch = BatchBuilder::new()
            .enqueue(ToolId::TicketTracker, ActionId::new("First"), vec![])
            .enqueue(ToolId::TicketTracker, ActionId::new("Second"), vec![])
            .enqueue(ToolId::TicketTracker, ActionId::new("Third"), vec![])
            .seal();

        let router = Router::new(registrations, &resolver);
        let report = router.dispatch("alice", &batch);

        assert_eq!(report.attempted, 3);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].action, ActionId::new("Second"));
        assert!(!report.is_success());
        assert!(report.skipped.is_empty());
        // The first and third envelopes' side effects happened.
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_missing_registration_is_skipped_not_failed() {
        let mut registrations = RegistrationSet::default();
        registrations.record(registration("Known"));

        let resolver = StaticResolver::new().register(
            ProductId::new("Trac"),
            ToolId::TicketTracker,
            ActionId::new("Known"),
            Probe::new(Arc::default(), false),
        );

        let batch = BatchBuilder::new()
            .enqueue(ToolId::TicketTracker, ActionId::new("Known"), vec![])
            .enqueue(ToolId::TicketTracker, ActionId::new("Unknown"), vec![])
            .seal();

        let router = Router::new(registrations, &resolver);
        let report = router.dispatch("alice", &batch);

        assert!(report.is_success());
        assert_eq!(report.attempted, 1);
        assert_eq!(
            report.skipped,
            vec![SkippedAction {
                product: Some(ProductId::new("Trac")),
                tool: ToolId::TicketTracker,
                action: ActionId::new("Unknown"),
            }]
        );
    }

    #[test]
    fn test_tool_with_no_products_skips_without_product() {
        let registrations = RegistrationSet::default();
        let resolver = StaticResolver::new();
        let batch = BatchBuilder::new()
            .enqueue(ToolId::Wiki, ActionId::new("Publish"), vec![])
            .seal();

        let report = Router::new(registrations, &resolver).dispatch("alice", &batch);
        assert!(report.is_success());
        assert_eq!(report.attempted, 0);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].product, None);
    }

    #[test]
    fn test_argument_order_is_product_then_action_parameters() {
        let mut registrations = RegistrationSet::default();
        registrations.record(
            registration("AddLink").with_product_parameters(vec!["/var/trac".to_string()]),
        );

        let log: InvocationLog = Arc::default();
        let resolver = StaticResolver::new().register(
            ProductId::new("Trac"),
            ToolId::TicketTracker,
            ActionId::new("AddLink"),
            Probe::new(log.clone(), false),
        );

        let batch = BatchBuilder::new()
            .enqueue(
                ToolId::TicketTracker,
                ActionId::new("AddLink"),
                vec!["123".to_string(), "rev42".to_string()],
            )
            .seal();

        Router::new(registrations, &resolver).dispatch("alice", &batch);

        let entries = log.lock().unwrap();
        assert_eq!(
            entries[0],
            vec!["alice", "/var/trac", "123", "rev42"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }
}
