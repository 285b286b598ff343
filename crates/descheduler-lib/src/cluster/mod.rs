//! Kubernetes-backed collaborators for the strategy
//!
//! This module provides:
//! - Priority threshold resolution from PriorityClass objects
//! - Pod listing by node with the strategy's filters applied
//! - Eviction through the Eviction subresource, with dry-run support
//! - The evictable predicate and node-fit checks

mod evictable;
mod evictor;
mod lister;
mod node_fit;
mod priority;

pub use evictable::{is_evictable, EvictionOptions, EVICT_ANNOTATION};
pub use evictor::KubePodEvictor;
pub use lister::{node_field_selector, KubePodLister};
pub use node_fit::{is_node_ready, pod_fits_any_other_node, pod_fits_node};
pub use priority::{KubePriorityResolver, PrioritySource, SYSTEM_CRITICAL_PRIORITY};
