//! Payment allocation
//!
//! [`PaymentAllocator`] spreads an incoming payment over a client's unpaid
//! shipments, oldest delivery first, inside one transaction.

pub mod allocator;

pub use allocator::{AllocationPlan, AllocationSlice, PaymentAllocator, plan_allocation};
