use iced::time;
use iced::widget::image::Handle;
use iced::{event, window, Element, Subscription, Task, Theme};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod archive;
mod error;
mod picture;
mod state;
mod sync;
mod ui;

use archive::latest::utc_now;
use picture::loader::{self, Frame, FrameOptions};
use state::cache;
use state::marker::LastCheck;
use state::rotation::{Crossfade, HoldToExit, Layer, RotationState, Selection, Slide, Slideshow};
use state::settings::Settings;
use ui::input::Input;

/// Main application state
struct SolarFrame {
    /// Settings and archive client shared with the sync jobs
    ctx: sync::Context,
    /// When to poll the archive; at most one sync job at a time
    schedule: sync::PollSchedule,
    /// Stills found by the last directory listing
    cached_count: usize,
    slideshow: Slideshow,
    pointer_down: bool,
    frame_options: FrameOptions,
    placeholder: Handle,
    background: Handle,
    foreground: Handle,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    /// Display tick
    Tick(Instant),
    /// Keyboard, mouse or touch input
    Input(Input),
    /// Startup backfill completed
    StartupSynced(sync::SyncReport),
    /// Periodic poll completed
    Polled(sync::PollReport),
    /// A still finished decoding for one of the layers
    FrameLoaded {
        layer: Layer,
        path: PathBuf,
        result: Result<Frame, String>,
    },
}

impl SolarFrame {
    /// Create the slideshow and start the startup backfill
    fn new(ctx: sync::Context) -> (Self, Task<Message>) {
        let settings = ctx.settings.clone();

        let frame_options = FrameOptions {
            size: settings.display_size,
            cropping: settings.cropping,
            crop_extra_edge: settings.crop_extra_edge,
        };
        let placeholder = ui::slideshow::handle(loader::placeholder_frame(
            settings.placeholder_image.as_deref(),
            frame_options,
        ));

        let now = utc_now();
        let marker = LastCheck::new(settings.marker_file.clone());
        let fallback = now.checked_sub_signed(settings.check_interval()).unwrap_or(now);
        let mut schedule = sync::PollSchedule::new(marker, fallback);
        schedule.begin_sync();

        let cached_count = cache::scan(&settings.cache_dir).len();
        tracing::info!(
            channel = %settings.channel,
            resolution = %settings.resolution,
            cache = %settings.cache_dir.display(),
            cached_count,
            "🌞 SDO frame initialized"
        );

        let startup = Task::perform(sync::startup_sync(ctx.clone(), now), Message::StartupSynced);
        let mode = if settings.windowed() {
            Task::none()
        } else {
            window::get_latest().and_then(|id| window::change_mode(id, window::Mode::Fullscreen))
        };

        let app = SolarFrame {
            ctx,
            schedule,
            cached_count,
            slideshow: Slideshow::new(
                RotationState::new(settings.rotate_every(), settings.fading),
                Crossfade::new(settings.fade_step()),
                HoldToExit::new(settings.exit_hold_ticks()),
            ),
            pointer_down: false,
            frame_options,
            background: placeholder.clone(),
            foreground: placeholder.clone(),
            placeholder,
        };

        (app, Task::batch([startup, mode]))
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick(now) => self.tick(now),
            Message::Input(input) => {
                match input {
                    Input::Key => self.arm_burst(),
                    Input::PointerDown => {
                        self.pointer_down = true;
                        self.arm_burst();
                    }
                    Input::PointerUp => self.pointer_down = false,
                }
                Task::none()
            }
            Message::StartupSynced(report) => {
                self.schedule.finish_sync();
                self.cached_count = report.eviction.remaining;
                tracing::info!(
                    scrubbed = report.scrubbed,
                    fetched = report.range.fetched,
                    evicted = report.eviction.removed.len(),
                    cached = report.eviction.remaining,
                    "startup sync complete"
                );
                Task::none()
            }
            Message::Polled(report) => {
                self.schedule.finish_sync();
                self.cached_count = report.eviction.remaining;
                if let Some(latest) = report.latest.filter(|l| l.downloaded) {
                    tracing::info!(path = %latest.path.display(), captured_at = %latest.captured_at, "new still cached");
                }
                if let Some(movie) = report.movie.filter(|m| m.downloaded) {
                    tracing::info!(path = %movie.path.display(), fetched_at = %movie.fetched_at, "movie refreshed");
                }
                Task::none()
            }
            Message::FrameLoaded { layer, path, result } => {
                match result {
                    Ok(frame) => self.set_layer(layer, ui::slideshow::handle(frame)),
                    Err(err) => {
                        tracing::warn!(file = %path.display(), error = %err, "cannot show still, skipping");
                        self.slideshow.skip();
                    }
                }
                Task::none()
            }
        }
    }

    /// One display tick: exit hold, fade step, poll check, rotation
    fn tick(&mut self, now: Instant) -> Task<Message> {
        if self.slideshow.tick(self.pointer_down) {
            tracing::info!("pointer held, exiting");
            return iced::exit();
        }

        let mut tasks = Vec::new();
        let wall_clock = utc_now();
        if self
            .schedule
            .start_if_due(&self.ctx.settings, self.cached_count, wall_clock)
        {
            tasks.push(Task::perform(
                sync::poll(self.ctx.clone(), wall_clock),
                Message::Polled,
            ));
        }
        if self.slideshow.is_due(now) {
            tasks.push(self.rotate(now));
        }
        Task::batch(tasks)
    }

    /// Pick the next still and route it to the right layer
    fn rotate(&mut self, now: Instant) -> Task<Message> {
        let files = cache::scan(self.ctx.cache_dir());
        self.cached_count = files.len();

        let Some(Slide { selection, layer }) = self.slideshow.rotate(files.len(), now) else {
            return Task::none();
        };

        match selection {
            Selection::Placeholder => {
                let empty = error::Error::EmptyCache(self.ctx.cache_dir().to_path_buf());
                tracing::debug!(%empty, "showing placeholder");
                self.set_layer(layer, self.placeholder.clone());
                Task::none()
            }
            Selection::Index(index) => {
                let path = files[index].clone();
                tracing::trace!(
                    file = %path.display(),
                    index,
                    burst = self.slideshow.rotation().manual_burst(),
                    "update"
                );
                Task::perform(
                    loader::load_frame(path.clone(), self.frame_options),
                    move |result| Message::FrameLoaded {
                        layer,
                        path: path.clone(),
                        result: result.map_err(|e| e.to_string()),
                    },
                )
            }
        }
    }

    /// Rapidly run through the whole cache, ending on the newest still
    fn arm_burst(&mut self) {
        let count = cache::scan(self.ctx.cache_dir()).len();
        tracing::info!(count, "manual burst");
        self.slideshow.arm_burst(count);
    }

    fn set_layer(&mut self, layer: Layer, handle: Handle) {
        match layer {
            Layer::Background => self.background = handle,
            Layer::Foreground => self.foreground = handle,
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<'_, Message> {
        ui::slideshow::view(&self.background, &self.foreground, self.slideshow.opacity())
    }

    fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            time::every(self.ctx.settings.tick_interval()).map(Message::Tick),
            event::listen_with(ui::input::on_event),
        ])
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn main() -> iced::Result {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wgpu=warn,iced_wgpu=warn,naga=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load();
    let size = settings.display_size as f32;

    let ctx = match sync::Context::new(settings) {
        Ok(ctx) => ctx,
        Err(err) => {
            tracing::error!(error = %err, "⚠️  cannot set up the archive client");
            std::process::exit(1);
        }
    };

    iced::application("SDO Frame", SolarFrame::update, SolarFrame::view)
        .subscription(SolarFrame::subscription)
        .theme(SolarFrame::theme)
        .window_size((size, size))
        .resizable(false)
        .run_with(move || SolarFrame::new(ctx))
}
