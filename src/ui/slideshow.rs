use iced::widget::image::Handle;
use iced::widget::{container, image, stack};
use iced::{Color, ContentFit, Element, Length};

use crate::picture::loader::Frame;
use crate::Message;

/// Upload-ready handle for a decoded frame
pub fn handle(frame: Frame) -> Handle {
    Handle::from_rgba(frame.width, frame.height, frame.rgba)
}

/// Two full-surface layers: the background still and the fading foreground
///
/// `opacity` is the foreground opacity in 0.0..=1.0.
pub fn view<'a>(background: &Handle, foreground: &Handle, opacity: f32) -> Element<'a, Message> {
    let layer = |handle: &Handle| {
        image(handle.clone())
            .content_fit(ContentFit::Fill)
            .width(Length::Fill)
            .height(Length::Fill)
    };

    let content = stack![layer(background), layer(foreground).opacity(opacity)]
        .width(Length::Fill)
        .height(Length::Fill);

    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .style(|_theme| container::Style::default().background(Color::BLACK))
        .into()
}
