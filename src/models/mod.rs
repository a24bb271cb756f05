// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod athlete;
pub mod metric;

pub use athlete::{LeaderboardRow, MetricValue};
pub use metric::{Metric, QueryKey, TimeWindow};
