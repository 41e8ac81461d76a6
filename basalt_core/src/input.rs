// Copyright 2026 the Basalt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raw input normalization.
//!
//! Input devices are polled in a dedicated step invoked once per frame from
//! the render loop — not on a separate thread, so the update queue remains
//! the only synchronization domain in the system. Backends implement
//! [`InputSource`]; the [`InputBridge`] normalizes raw codes into
//! [`InputEvent`]s, clamps the pointer to the surface, coalesces
//! consecutive pointer moves between frames into one event, and delivers
//! on the reverse-direction [`EventChannel`](crate::events::EventChannel).

use crate::error::InputError;
use crate::events::{CallerEvent, EventChannel};

/// Raw event category, the portable shape of a Linux `input_event` type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RawEventKind {
    /// Relative axis motion (`EV_REL`).
    Relative,
    /// Absolute axis position (`EV_ABS`, e.g. touchscreens).
    Absolute,
    /// Key or button transition (`EV_KEY`).
    Key,
    /// Report separator (`EV_SYN`); carries no payload.
    Sync,
}

/// One raw event as read from a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawEvent {
    /// Event category.
    pub kind: RawEventKind,
    /// Device-specific code (axis or key number).
    pub code: u16,
    /// Payload (delta, position, or key state).
    pub value: i32,
}

/// Raw codes the bridge interprets (the relevant subset of the Linux
/// event-code space).
pub mod codes {
    /// Relative/absolute X axis.
    pub const AXIS_X: u16 = 0x00;
    /// Relative/absolute Y axis.
    pub const AXIS_Y: u16 = 0x01;
    /// Vertical wheel.
    pub const REL_WHEEL: u16 = 0x08;
    /// First mouse button code (`BTN_LEFT`).
    pub const BTN_LEFT: u16 = 0x110;
    /// Right mouse button.
    pub const BTN_RIGHT: u16 = 0x111;
    /// Middle mouse button.
    pub const BTN_MIDDLE: u16 = 0x112;
    /// End of the button range the bridge maps to pointer buttons.
    pub const BTN_LAST: u16 = 0x117;
}

/// A source of raw input events, polled once per frame.
pub trait InputSource {
    /// Appends all events that arrived since the last poll to `out`.
    ///
    /// Must not block: a dry source appends nothing and returns `Ok`.
    fn poll(&mut self, out: &mut Vec<RawEvent>) -> Result<(), InputError>;
}

/// An input source that never produces events.
///
/// Useful for headless runs and tests that exercise the loop without
/// devices.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullInputSource;

impl InputSource for NullInputSource {
    fn poll(&mut self, _out: &mut Vec<RawEvent>) -> Result<(), InputError> {
        Ok(())
    }
}

/// Pointer button identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerButton {
    /// Primary button.
    Left,
    /// Secondary button.
    Right,
    /// Middle/wheel button.
    Middle,
    /// Any other device button, carrying its raw code.
    Other(u16),
}

impl PointerButton {
    fn from_code(code: u16) -> Self {
        match code {
            codes::BTN_LEFT => Self::Left,
            codes::BTN_RIGHT => Self::Right,
            codes::BTN_MIDDLE => Self::Middle,
            other => Self::Other(other),
        }
    }
}

/// Key transition, as reported by the device (`EV_KEY` value 0/1/2).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyState {
    /// Key released.
    Released,
    /// Key pressed.
    Pressed,
    /// Autorepeat while held.
    Repeated,
}

/// A normalized input event, delivered to the caller thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputEvent {
    /// Pointer moved; at most one per frame (deltas are coalesced).
    PointerMoved {
        /// Clamped pointer position.
        x: i32,
        /// Clamped pointer position.
        y: i32,
        /// Accumulated delta since the previous frame.
        dx: i32,
        /// Accumulated delta since the previous frame.
        dy: i32,
    },
    /// Pointer button transition at the current pointer position.
    PointerButton {
        /// Which button.
        button: PointerButton,
        /// `true` on press, `false` on release.
        pressed: bool,
        /// Pointer position at the transition.
        x: i32,
        /// Pointer position at the transition.
        y: i32,
    },
    /// Keyboard key transition.
    Key {
        /// Raw key code.
        code: u16,
        /// Transition kind.
        state: KeyState,
    },
    /// Wheel scroll.
    Scroll {
        /// Signed wheel detents.
        delta: i32,
    },
}

/// Normalizes raw events and delivers them on the event channel.
///
/// Owns the pointer position, clamped to the surface bounds the way the
/// original embedded input path clamps against the screen size.
#[derive(Debug)]
pub struct InputBridge {
    width: i32,
    height: i32,
    x: i32,
    y: i32,
    pending_dx: i32,
    pending_dy: i32,
    move_pending: bool,
    scratch: Vec<RawEvent>,
}

impl InputBridge {
    /// Creates a bridge for a surface of the given size, pointer centered.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let width = i32::try_from(width).unwrap_or(i32::MAX);
        let height = i32::try_from(height).unwrap_or(i32::MAX);
        Self {
            width,
            height,
            x: width / 2,
            y: height / 2,
            pending_dx: 0,
            pending_dy: 0,
            move_pending: false,
            scratch: Vec::new(),
        }
    }

    /// Returns the current (clamped) pointer position.
    #[must_use]
    pub const fn pointer_position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Polls the source and delivers normalized events for this frame.
    ///
    /// Consecutive pointer moves are merged into a single
    /// [`InputEvent::PointerMoved`] emitted at the end of the poll (or
    /// earlier, if a button transition needs an up-to-date position).
    /// Returns the number of events delivered.
    pub fn poll_frame(
        &mut self,
        source: &mut dyn InputSource,
        channel: &EventChannel,
    ) -> Result<usize, InputError> {
        self.scratch.clear();
        source.poll(&mut self.scratch)?;

        let mut delivered = 0;
        let raw = std::mem::take(&mut self.scratch);
        for event in &raw {
            delivered += self.process(*event, channel);
        }
        self.scratch = raw;

        delivered += self.flush_pointer(channel);
        Ok(delivered)
    }

    fn process(&mut self, event: RawEvent, channel: &EventChannel) -> usize {
        match event.kind {
            RawEventKind::Relative => match event.code {
                codes::AXIS_X => {
                    self.pending_dx += event.value;
                    self.move_pending = true;
                    0
                }
                codes::AXIS_Y => {
                    self.pending_dy += event.value;
                    self.move_pending = true;
                    0
                }
                codes::REL_WHEEL => {
                    channel.push(CallerEvent::Input(InputEvent::Scroll { delta: event.value }));
                    1
                }
                _ => 0,
            },
            RawEventKind::Absolute => match event.code {
                codes::AXIS_X => {
                    self.pending_dx += event.value - (self.x + self.pending_dx);
                    self.move_pending = true;
                    0
                }
                codes::AXIS_Y => {
                    self.pending_dy += event.value - (self.y + self.pending_dy);
                    self.move_pending = true;
                    0
                }
                _ => 0,
            },
            RawEventKind::Key => {
                if (codes::BTN_LEFT..=codes::BTN_LAST).contains(&event.code) {
                    // Button positions must reflect motion already read this
                    // frame, so flush the coalesced move first.
                    let flushed = self.flush_pointer(channel);
                    let pressed = match event.value {
                        0 => false,
                        1 => true,
                        // Autorepeat on a button carries no transition.
                        _ => return flushed,
                    };
                    channel.push(CallerEvent::Input(InputEvent::PointerButton {
                        button: PointerButton::from_code(event.code),
                        pressed,
                        x: self.x,
                        y: self.y,
                    }));
                    flushed + 1
                } else {
                    let state = match event.value {
                        0 => KeyState::Released,
                        1 => KeyState::Pressed,
                        _ => KeyState::Repeated,
                    };
                    channel.push(CallerEvent::Input(InputEvent::Key {
                        code: event.code,
                        state,
                    }));
                    1
                }
            }
            RawEventKind::Sync => 0,
        }
    }

    fn flush_pointer(&mut self, channel: &EventChannel) -> usize {
        if !self.move_pending {
            return 0;
        }
        let dx = self.pending_dx;
        let dy = self.pending_dy;
        self.pending_dx = 0;
        self.pending_dy = 0;
        self.move_pending = false;

        self.x = (self.x + dx).clamp(0, self.width.saturating_sub(1));
        self.y = (self.y + dy).clamp(0, self.height.saturating_sub(1));
        channel.push(CallerEvent::Input(InputEvent::PointerMoved {
            x: self.x,
            y: self.y,
            dx,
            dy,
        }));
        1
    }
}
