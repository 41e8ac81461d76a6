// Copyright 2026 the Basalt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display modes and negotiation.
//!
//! Mode selection is pure: given the platform's available modes and the
//! startup request, pick the best match. Exact matches win; otherwise the
//! nearest resolution wins, and among resolution ties the nearest refresh
//! rate. Attaching the selected mode is asynchronous on embedded targets
//! and belongs to the backend (see
//! [`DisplayBackend::wait_attach`](crate::surface::DisplayBackend::wait_attach)).

use core::fmt;

/// One display mode offered by the platform.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayMode {
    /// Horizontal resolution in pixels.
    pub width: u32,
    /// Vertical resolution in pixels.
    pub height: u32,
    /// Refresh rate in Hz.
    pub refresh_hz: u32,
}

impl DisplayMode {
    /// Creates a mode.
    #[must_use]
    pub const fn new(width: u32, height: u32, refresh_hz: u32) -> Self {
        Self {
            width,
            height,
            refresh_hz,
        }
    }
}

impl fmt::Debug for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}@{}", self.width, self.height, self.refresh_hz)
    }
}

/// The startup display request, fixed for the life of the surface.
///
/// Reconfiguration means full teardown and recreation; there is no runtime
/// mode switching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModeRequest {
    /// Requested horizontal resolution.
    pub width: u32,
    /// Requested vertical resolution.
    pub height: u32,
    /// Requested refresh rate in Hz.
    pub refresh_hz: u32,
    /// Whether to claim the whole display (embedded targets ignore this;
    /// they have nothing but the whole display).
    pub fullscreen: bool,
}

/// Selects the best available mode for a request.
///
/// Preference order:
///
/// 1. exact resolution and refresh rate,
/// 2. nearest resolution (minimal `|Δw| + |Δh|`),
/// 3. among resolution ties, nearest refresh rate.
///
/// Earlier entries win remaining ties, so the platform's mode ordering is
/// the final tiebreak. Returns `None` when no modes are available.
#[must_use]
pub fn select_mode(available: &[DisplayMode], request: &ModeRequest) -> Option<DisplayMode> {
    fn distance(a: u32, b: u32) -> u64 {
        u64::from(a.abs_diff(b))
    }

    available
        .iter()
        .min_by_key(|mode| {
            (
                distance(mode.width, request.width) + distance(mode.height, request.height),
                distance(mode.refresh_hz, request.refresh_hz),
            )
        })
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn request(width: u32, height: u32, refresh_hz: u32) -> ModeRequest {
        ModeRequest {
            width,
            height,
            refresh_hz,
            fullscreen: false,
        }
    }

    #[test]
    fn exact_match_wins() {
        let available = [
            DisplayMode::new(1280, 720, 60),
            DisplayMode::new(1920, 1080, 60),
            DisplayMode::new(1920, 1080, 50),
        ];
        assert_eq!(
            select_mode(&available, &request(1920, 1080, 60)),
            Some(DisplayMode::new(1920, 1080, 60))
        );
    }

    #[test]
    fn nearest_resolution_beats_matching_rate() {
        // No exact match: resolution proximity outranks refresh rate.
        let available = [
            DisplayMode::new(1920, 1080, 50),
            DisplayMode::new(1280, 720, 60),
        ];
        assert_eq!(
            select_mode(&available, &request(1920, 1080, 60)),
            Some(DisplayMode::new(1920, 1080, 50))
        );
    }

    #[test]
    fn refresh_rate_breaks_resolution_ties() {
        let available = [
            DisplayMode::new(1920, 1080, 24),
            DisplayMode::new(1920, 1080, 50),
            DisplayMode::new(1920, 1080, 75),
        ];
        assert_eq!(
            select_mode(&available, &request(1920, 1080, 60)),
            Some(DisplayMode::new(1920, 1080, 50))
        );
    }

    #[test]
    fn platform_order_breaks_full_ties() {
        // 59 and 61 are equally distant from 60; the earlier entry wins.
        let available = [
            DisplayMode::new(1920, 1080, 61),
            DisplayMode::new(1920, 1080, 59),
        ];
        assert_eq!(
            select_mode(&available, &request(1920, 1080, 60)),
            Some(DisplayMode::new(1920, 1080, 61))
        );
    }

    #[test]
    fn empty_mode_list_selects_nothing() {
        assert_eq!(select_mode(&[], &request(1920, 1080, 60)), None);
    }
}
