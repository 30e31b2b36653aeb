/// Slideshow state machine
///
/// Three independent concerns advance once per display tick:
/// - `RotationState`: which cached still is next, including the manual burst
/// - `Crossfade`: foreground opacity and which layer receives the next still
/// - `HoldToExit`: quit after the pointer has been held long enough
///
/// None of them touches the filesystem or the renderer, the app feeds
/// them the file count and applies their decisions.

use std::time::{Duration, Instant};

/// What the display should show after an advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Show the still at this index of the sorted cache listing
    Index(usize),
    /// Nothing cached, show the "no data" frame
    Placeholder,
}

/// Cyclic index over the cache plus the manual burst override
#[derive(Debug, Clone)]
pub struct RotationState {
    /// `None` means nothing has been shown yet (or there was nothing to show)
    current_index: Option<usize>,
    /// Forced advances left before normal rotation resumes
    manual_burst: usize,
    /// Whether slides cross-fade right now
    fading: bool,
    /// Configured fade mode, restored when a burst ends
    fading_setting: bool,
    rotate_every: Duration,
    last_rotation: Option<Instant>,
}

impl RotationState {
    pub fn new(rotate_every: Duration, fading: bool) -> Self {
        Self {
            current_index: None,
            manual_burst: 0,
            fading,
            fading_setting: fading,
            rotate_every,
            last_rotation: None,
        }
    }

    #[cfg(test)]
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn manual_burst(&self) -> usize {
        self.manual_burst
    }

    pub fn fading(&self) -> bool {
        self.fading
    }

    /// True when the slide timer elapsed or a burst is running
    pub fn is_due(&self, now: Instant) -> bool {
        if self.manual_burst > 0 {
            return true;
        }
        match self.last_rotation {
            Some(last) => now.duration_since(last) >= self.rotate_every,
            None => true,
        }
    }

    /// Start a rapid run through the whole cache (any key or pointer press)
    ///
    /// An empty cache has nothing to run through, so fading stays as configured.
    pub fn arm_burst(&mut self, file_count: usize) {
        self.manual_burst = file_count;
        self.current_index = None;
        self.fading = file_count == 0 && self.fading_setting;
    }

    /// Make the next tick advance regardless of the timer
    pub fn skip(&mut self) {
        self.last_rotation = None;
    }

    /// Consume one burst step
    ///
    /// When the burst runs out, fading is restored and the index jumps to
    /// the second-to-last still so the following advance ends on the newest.
    /// Returns true when this call ended the burst.
    pub fn tick_burst(&mut self, file_count: usize) -> bool {
        if self.manual_burst == 0 {
            return false;
        }
        self.manual_burst -= 1;
        if self.manual_burst > 0 {
            return false;
        }

        self.current_index = file_count.checked_sub(2);
        self.fading = self.fading_setting;
        true
    }

    /// Step the index cyclically over a listing of `file_count` stills
    pub fn select_next(&mut self, file_count: usize) -> Selection {
        if file_count == 0 {
            self.current_index = None;
            return Selection::Placeholder;
        }

        let next = match self.current_index {
            Some(index) if index + 1 < file_count => index + 1,
            _ => 0,
        };
        self.current_index = Some(next);
        Selection::Index(next)
    }

    /// One full rotation step at `now`: burst bookkeeping then selection
    pub fn advance(&mut self, file_count: usize, now: Instant) -> Selection {
        self.tick_burst(file_count);
        self.last_rotation = Some(now);
        self.select_next(file_count)
    }
}

/// The two stacked image layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Background,
    Foreground,
}

/// Opacity animation of the foreground layer over the background
#[derive(Debug, Clone)]
pub struct Crossfade {
    /// Foreground opacity, 0.0 to 255.0
    alpha: f32,
    /// Opacity change per tick
    step: f32,
    /// Fade direction: toward 255 when true, toward 0 when false
    show_image: bool,
    /// Whether the last completed fade left the foreground fully visible
    image_shown: bool,
    /// Whether the current fade has reached its target
    done: bool,
}

impl Crossfade {
    pub fn new(step: f32) -> Self {
        Self {
            alpha: 0.0,
            step,
            show_image: false,
            image_shown: false,
            done: true,
        }
    }

    /// Foreground opacity in 0.0..=1.0
    pub fn opacity(&self) -> f32 {
        self.alpha / 255.0
    }

    #[cfg(test)]
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    #[cfg(test)]
    pub fn is_done(&self) -> bool {
        self.done
    }

    #[cfg(test)]
    pub fn image_shown(&self) -> bool {
        self.image_shown
    }

    /// Move the foreground one step toward the current target
    pub fn tick(&mut self) {
        if self.show_image {
            self.alpha = (self.alpha + self.step).min(255.0);
            self.done = self.alpha >= 255.0;
            if self.done {
                self.image_shown = true;
            }
        } else {
            self.alpha = (self.alpha - self.step).max(0.0);
            self.done = self.alpha <= 0.0;
            if self.done {
                self.image_shown = false;
            }
        }
    }

    /// Decide which layer receives the next still, then reverse direction
    ///
    /// A finished fade-in hides the background, so the new still goes
    /// there; a finished fade-out hides the foreground, which is reset to
    /// transparent and takes the new still. A fade still in progress
    /// receives nothing.
    pub fn on_rotate(&mut self) -> Option<Layer> {
        let target = match (self.done, self.image_shown) {
            (true, true) => Some(Layer::Background),
            (true, false) => {
                self.alpha = 0.0;
                Some(Layer::Foreground)
            }
            (false, _) => None,
        };
        self.show_image = !self.show_image;
        target
    }

    /// Swap without animation: the new still goes to the opaque foreground
    ///
    /// Leaves the fade settled on a shown foreground, so fading can resume
    /// from here.
    pub fn show_immediately(&mut self) -> Layer {
        self.alpha = 255.0;
        self.show_image = true;
        self.image_shown = true;
        self.done = true;
        Layer::Foreground
    }
}

/// Counts consecutive ticks with the pointer held down
#[derive(Debug, Clone)]
pub struct HoldToExit {
    ticks: u32,
    limit: u32,
}

impl HoldToExit {
    pub fn new(limit: u32) -> Self {
        Self { ticks: 0, limit }
    }

    /// Returns true once the pointer has been held for more than `limit` ticks
    pub fn tick(&mut self, pressed: bool) -> bool {
        if !pressed {
            self.ticks = 0;
            return false;
        }
        self.ticks += 1;
        self.ticks > self.limit
    }
}

/// What to show next and where
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slide {
    pub selection: Selection,
    pub layer: Layer,
}

/// Rotation, cross-fade and hold-to-exit driven together by the display tick
#[derive(Debug, Clone)]
pub struct Slideshow {
    rotation: RotationState,
    fade: Crossfade,
    hold: HoldToExit,
}

impl Slideshow {
    pub fn new(rotation: RotationState, fade: Crossfade, hold: HoldToExit) -> Self {
        Self { rotation, fade, hold }
    }

    pub fn rotation(&self) -> &RotationState {
        &self.rotation
    }

    /// Foreground opacity in 0.0..=1.0
    pub fn opacity(&self) -> f32 {
        self.fade.opacity()
    }

    /// Per-tick animation; returns true once the pointer was held long enough to quit
    pub fn tick(&mut self, pointer_down: bool) -> bool {
        if self.hold.tick(pointer_down) {
            return true;
        }
        if self.rotation.fading() {
            self.fade.tick();
        }
        false
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.rotation.is_due(now)
    }

    pub fn arm_burst(&mut self, file_count: usize) {
        self.rotation.arm_burst(file_count);
    }

    pub fn skip(&mut self) {
        self.rotation.skip();
    }

    /// Advance over `file_count` stills and pick the layer that receives the result
    ///
    /// Returns `None` while a fade is still running; that slide is dropped.
    pub fn rotate(&mut self, file_count: usize, now: Instant) -> Option<Slide> {
        let selection = self.rotation.advance(file_count, now);
        let layer = if self.rotation.fading() {
            self.fade.on_rotate()?
        } else {
            self.fade.show_immediately()
        };
        Some(Slide { selection, layer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotation() -> RotationState {
        RotationState::new(Duration::from_millis(600), true)
    }

    #[test]
    fn test_index_cycles() {
        let mut state = rotation();
        let count = 5;

        assert_eq!(state.select_next(count), Selection::Index(0));
        for _ in 0..count {
            state.select_next(count);
        }
        // K + 1 advances in total land back on the first index
        assert_eq!(state.current_index(), Some(0));
    }

    #[test]
    fn test_index_wraps_when_listing_shrinks() {
        let mut state = rotation();
        for _ in 0..4 {
            state.select_next(10);
        }
        assert_eq!(state.current_index(), Some(3));
        assert_eq!(state.select_next(3), Selection::Index(0));
    }

    #[test]
    fn test_empty_cache_selects_placeholder() {
        let mut state = rotation();
        state.select_next(3);
        assert_eq!(state.select_next(0), Selection::Placeholder);
        assert_eq!(state.current_index(), None);
        assert_eq!(state.select_next(2), Selection::Index(0));
    }

    #[test]
    fn test_burst_lands_on_second_to_last() {
        let mut state = rotation();
        let count = 7;

        state.arm_burst(count);
        assert!(!state.fading());
        assert_eq!(state.manual_burst(), count);

        let mut ended = false;
        for _ in 0..count {
            ended = state.tick_burst(count);
        }
        assert!(ended);
        assert_eq!(state.manual_burst(), 0);
        assert_eq!(state.current_index(), Some(count - 2));
        assert!(state.fading());

        // The following selection is the newest still
        assert_eq!(state.select_next(count), Selection::Index(count - 1));
    }

    #[test]
    fn test_burst_walks_whole_cache() {
        let mut state = rotation();
        let now = Instant::now();
        let count = 4;

        state.arm_burst(count);
        let mut shown = Vec::new();
        while state.manual_burst() > 0 {
            assert!(state.is_due(now));
            if let Selection::Index(i) = state.advance(count, now) {
                shown.push(i);
            }
        }
        assert_eq!(shown, vec![0, 1, 2, 3]);
        assert!(!state.is_due(now));
    }

    #[test]
    fn test_burst_with_single_file() {
        let mut state = rotation();
        state.arm_burst(1);
        assert!(state.tick_burst(1));
        assert_eq!(state.current_index(), None);
        assert_eq!(state.select_next(1), Selection::Index(0));
    }

    #[test]
    fn test_burst_on_empty_cache_keeps_fading() {
        let mut state = rotation();
        let start = Instant::now();

        state.arm_burst(0);
        assert!(state.fading());
        assert_eq!(state.manual_burst(), 0);

        for i in 0..5 {
            state.advance(3, start + Duration::from_secs(i));
            assert!(state.fading());
        }

        let mut plain = RotationState::new(Duration::from_millis(600), false);
        plain.arm_burst(0);
        assert!(!plain.fading());
    }

    #[test]
    fn test_burst_restores_configured_fading() {
        let mut state = RotationState::new(Duration::from_millis(600), false);
        state.arm_burst(2);
        state.tick_burst(2);
        state.tick_burst(2);
        assert!(!state.fading());
    }

    #[test]
    fn test_timer_and_skip() {
        let mut state = rotation();
        let start = Instant::now();
        assert!(state.is_due(start));

        state.advance(3, start);
        assert!(!state.is_due(start + Duration::from_millis(100)));
        assert!(state.is_due(start + Duration::from_millis(600)));

        state.skip();
        assert!(state.is_due(start));
    }

    #[test]
    fn test_crossfade_alternates() {
        let mut fade = Crossfade::new(100.0);

        // Initially hidden and settled: the first still goes to the foreground
        assert_eq!(fade.on_rotate(), Some(Layer::Foreground));
        assert_eq!(fade.alpha(), 0.0);

        fade.tick();
        assert!(!fade.is_done());
        assert_eq!(fade.on_rotate(), None);

        // Direction flipped back to hiding; run it out
        fade.tick();
        assert!(fade.is_done());
        assert!(!fade.image_shown());

        // Now fading in
        assert_eq!(fade.on_rotate(), Some(Layer::Foreground));
        fade.tick();
        fade.tick();
        fade.tick();
        assert_eq!(fade.alpha(), 255.0);
        assert!(fade.image_shown());

        // Fully shown: next still is loaded behind it and the fade reverses
        assert_eq!(fade.on_rotate(), Some(Layer::Background));
        fade.tick();
        assert_eq!(fade.alpha(), 155.0);
    }

    #[test]
    fn test_show_immediately() {
        let mut fade = Crossfade::new(34.0);
        assert_eq!(fade.show_immediately(), Layer::Foreground);
        assert_eq!(fade.opacity(), 1.0);

        // Fading picks up by loading behind the shown still
        assert_eq!(fade.on_rotate(), Some(Layer::Background));
        fade.tick();
        assert_eq!(fade.alpha(), 221.0);
    }

    #[test]
    fn test_hold_to_exit() {
        let mut hold = HoldToExit::new(3);
        assert!(!hold.tick(true));
        assert!(!hold.tick(true));
        assert!(!hold.tick(false));
        assert!(!hold.tick(true));
        assert!(!hold.tick(true));
        assert!(!hold.tick(true));
        assert!(hold.tick(true));
    }

    fn slideshow(fading: bool) -> Slideshow {
        Slideshow::new(
            RotationState::new(Duration::from_millis(600), fading),
            Crossfade::new(100.0),
            HoldToExit::new(3),
        )
    }

    #[test]
    fn test_slideshow_routes_fading_slides() {
        let mut show = slideshow(true);
        let start = Instant::now();

        let first = show.rotate(3, start).unwrap();
        assert_eq!(first, Slide { selection: Selection::Index(0), layer: Layer::Foreground });

        // Fade in progress: the next slide is dropped
        show.tick(false);
        assert!(show.rotate(3, start + Duration::from_secs(1)).is_none());

        // Let the fade settle hidden, then the foreground takes the next still
        show.tick(false);
        let next = show.rotate(3, start + Duration::from_secs(2)).unwrap();
        assert_eq!(next.layer, Layer::Foreground);
        for _ in 0..3 {
            show.tick(false);
        }
        assert_eq!(show.opacity(), 1.0);

        // Fully shown: the following still loads behind it
        let behind = show.rotate(3, start + Duration::from_secs(3)).unwrap();
        assert_eq!(behind.layer, Layer::Background);
    }

    #[test]
    fn test_slideshow_without_fading_always_uses_foreground() {
        let mut show = slideshow(false);
        let start = Instant::now();

        for i in 0..4 {
            let slide = show.rotate(2, start + Duration::from_secs(i)).unwrap();
            assert_eq!(slide.layer, Layer::Foreground);
            assert_eq!(show.opacity(), 1.0);
        }

        let empty = show.rotate(0, start + Duration::from_secs(5)).unwrap();
        assert_eq!(empty.selection, Selection::Placeholder);
    }

    #[test]
    fn test_slideshow_burst_swaps_without_fading() {
        let mut show = slideshow(true);
        let start = Instant::now();

        show.arm_burst(3);
        let mut slides = Vec::new();
        while show.rotation().manual_burst() > 0 {
            slides.push(show.rotate(3, start).unwrap());
        }

        // Instant swaps, then the newest still loads behind the last one
        // as fading resumes
        assert_eq!(
            slides,
            vec![
                Slide { selection: Selection::Index(0), layer: Layer::Foreground },
                Slide { selection: Selection::Index(1), layer: Layer::Foreground },
                Slide { selection: Selection::Index(2), layer: Layer::Background },
            ]
        );
        assert!(show.rotation().fading());
        assert_eq!(show.opacity(), 1.0);
    }

    #[test]
    fn test_slideshow_hold_exits_without_animating() {
        let mut show = slideshow(true);
        show.rotate(1, Instant::now());

        assert!(!show.tick(true));
        assert_eq!(show.opacity(), 100.0 / 255.0);
        assert!(!show.tick(true));
        assert!(!show.tick(true));
        assert!(show.tick(true));
    }
}
