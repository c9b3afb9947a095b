// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Business logic services.

pub mod booking;
pub mod interval;
pub mod lifecycle;
pub mod notify;

pub use booking::BookingService;
pub use interval::OccupiedInterval;
pub use lifecycle::{Clock, LifecycleScheduler, SystemClock};
pub use notify::{LogNotifier, Notifier};
