//! RealNodeUtilization descheduling strategy
//!
//! This module provides:
//! - Collaborator ports for priority resolution, pod listing and eviction
//! - The memory threshold decision rule and eviction candidate selection
//! - The orchestrator that drives one decision pass over the cluster nodes

mod ports;
mod real_utilization;
mod selection;


pub use ports::{
    pod_priority, EvictableFactory, EvictablePredicate, PodEvictor, PodFilter, PodLister,
    PriorityResolver,
};
pub use real_utilization::{RealNodeUtilization, RunSummary, StrategyError, STRATEGY_NAME};
pub use selection::{find_violation, select_pod};
