use iced::event::{self, Event};
use iced::{keyboard, mouse, touch, window};

use crate::Message;

/// User input the slideshow reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// Any key, or a non-primary mouse button
    Key,
    /// Primary button or finger down: starts a burst and the exit hold
    PointerDown,
    /// Primary button or finger up
    PointerUp,
}

/// Map raw runtime events to slideshow input
///
/// Events are taken even when a widget captured them; the slideshow has
/// no interactive widgets.
pub fn on_event(event: Event, _status: event::Status, _window: window::Id) -> Option<Message> {
    let input = match event {
        Event::Keyboard(keyboard::Event::KeyPressed { .. }) => Input::Key,
        Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => Input::PointerDown,
        Event::Mouse(mouse::Event::ButtonPressed(_)) => Input::Key,
        Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => Input::PointerUp,
        Event::Touch(touch::Event::FingerPressed { .. }) => Input::PointerDown,
        Event::Touch(touch::Event::FingerLifted { .. } | touch::Event::FingerLost { .. }) => Input::PointerUp,
        _ => return None,
    };
    Some(Message::Input(input))
}
