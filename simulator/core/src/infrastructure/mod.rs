// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod event_bus;
pub mod metrics;

pub use self::event_bus::{EventBus, EventBusError, EventReceiver, WorkerEventReceiver};
pub use self::metrics::{describe_metrics, metrics_observer};
