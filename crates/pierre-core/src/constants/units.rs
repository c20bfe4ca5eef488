// ABOUTME: Unit conversion factors applied at the provider boundary
// ABOUTME: Canonical units are count, kilocalories, meters, and beats per minute
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Kilojoules in one kilocalorie (thermochemical calorie)
pub const KILOJOULES_PER_KILOCALORIE: f64 = 4.184;

/// Joules in one kilocalorie
pub const JOULES_PER_KILOCALORIE: f64 = 4_184.0;

/// Meters in one kilometer
pub const METERS_PER_KILOMETER: f64 = 1_000.0;

/// Meters in one statute mile
pub const METERS_PER_MILE: f64 = 1_609.344;

/// Seconds in one minute, used for beats-per-second to beats-per-minute
pub const SECONDS_PER_MINUTE: f64 = 60.0;
