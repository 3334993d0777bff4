#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Macroquad-backed rendering adapter for Marble Maze.
//!
//! Macroquad's optional audio stack depends on native ALSA development
//! libraries, which are unavailable in the containerised CI environment.
//! To keep `cargo test` usable everywhere we depend on macroquad without its
//! default `audio` feature.
//!
//! Tiles are drawn as primitive shapes. The arrow keys emulate tilting the
//! device and holding the left mouse button steers the marble towards the
//! cursor.

use anyhow::Result;
use glam::Vec2;
use macroquad::input::{
    is_key_down, is_key_pressed, is_mouse_button_down, mouse_position, KeyCode, MouseButton,
};
use marble_maze_core::TileKind;
use marble_maze_rendering::{
    Color, FrameInput, PlayfieldPresentation, Presentation, RenderingBackend, Scene,
    SpriteInstance,
};
use std::time::{Duration, Instant};

const SCORE_FONT_SIZE: f32 = 32.0;
const BANNER_FONT_SIZE: f32 = 56.0;
const SCORE_ANCHOR: Vec2 = Vec2::new(16.0, 16.0);
const MIN_WINDOW_EXTENT: i32 = 320;

/// Rendering backend implemented on top of macroquad.
#[derive(Debug)]
pub struct MacroquadBackend {
    swap_interval: Option<i32>,
    show_fps: bool,
    tilt_strength: f32,
}

impl Default for MacroquadBackend {
    fn default() -> Self {
        Self {
            swap_interval: None,
            show_fps: false,
            tilt_strength: 0.2,
        }
    }
}

impl MacroquadBackend {
    /// Returns a backend that requests the platform's default swap interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the backend to request a specific swap interval from the platform.
    #[must_use]
    pub fn with_swap_interval(mut self, swap_interval: Option<i32>) -> Self {
        self.swap_interval = swap_interval;
        self
    }

    /// Configures the backend to either synchronise presentation with the display refresh rate
    /// or render as fast as possible.
    #[must_use]
    pub fn with_vsync(self, enabled: bool) -> Self {
        let swap_interval = if enabled { Some(1) } else { Some(0) };
        self.with_swap_interval(swap_interval)
    }

    /// Configures whether the backend logs frame timing metrics once per second.
    #[must_use]
    pub fn with_show_fps(mut self, show: bool) -> Self {
        self.show_fps = show;
        self
    }

    /// Configures the acceleration, in g, reported while an arrow key is held.
    #[must_use]
    pub fn with_tilt_strength(mut self, strength: f32) -> Self {
        self.tilt_strength = strength;
        self
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct FrameBreakdown {
    frame: Duration,
    update: Duration,
    render: Duration,
}

#[derive(Clone, Copy, Debug)]
struct FpsMetrics {
    per_second: f32,
    avg_update: Duration,
    avg_render: Duration,
}

#[derive(Debug, Default)]
struct FpsCounter {
    elapsed: Duration,
    frames: u32,
    update_accum: Duration,
    render_accum: Duration,
}

impl FpsCounter {
    /// Records a rendered frame and returns averages once a second has elapsed.
    fn record_frame(&mut self, breakdown: FrameBreakdown) -> Option<FpsMetrics> {
        self.elapsed += breakdown.frame;
        self.frames = self.frames.saturating_add(1);
        self.update_accum += breakdown.update;
        self.render_accum += breakdown.render;

        if self.elapsed < Duration::from_secs(1) {
            return None;
        }

        let seconds = self.elapsed.as_secs_f32();
        let frames = self.frames.max(1);
        let metrics = FpsMetrics {
            per_second: self.frames as f32 / seconds,
            avg_update: self.update_accum / frames,
            avg_render: self.render_accum / frames,
        };
        *self = Self::default();
        Some(metrics)
    }
}

impl RenderingBackend for MacroquadBackend {
    fn run<F>(self, presentation: Presentation, mut update_scene: F) -> Result<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) + 'static,
    {
        let Self {
            swap_interval,
            show_fps,
            tilt_strength,
        } = self;

        let Presentation {
            window_title,
            clear_color,
            scene,
        } = presentation;

        let mut config = macroquad::window::Conf {
            window_title,
            window_width: (scene.playfield.width().round() as i32).max(MIN_WINDOW_EXTENT),
            window_height: (scene.playfield.height().round() as i32).max(MIN_WINDOW_EXTENT),
            ..macroquad::window::Conf::default()
        };
        if let Some(swap_interval) = swap_interval {
            config.platform.swap_interval = Some(swap_interval);
        }

        macroquad::Window::from_config(config, async move {
            let mut scene = scene;
            let background = to_macroquad_color(clear_color);
            let mut fps_counter = FpsCounter::default();

            loop {
                if is_key_pressed(KeyCode::Escape) || is_key_pressed(KeyCode::Q) {
                    break;
                }

                macroquad::window::clear_background(background);

                let screen_width = macroquad::window::screen_width();
                let screen_height = macroquad::window::screen_height();
                let dt_seconds = macroquad::time::get_frame_time();
                let frame_dt = Duration::from_secs_f32(dt_seconds.max(0.0));

                let metrics = SceneMetrics::from_playfield(
                    &scene.playfield,
                    screen_width,
                    screen_height,
                );
                let frame_input = gather_frame_input(&scene.playfield, &metrics, tilt_strength);

                let update_start = Instant::now();
                update_scene(frame_dt, frame_input, &mut scene);
                let update_duration = update_start.elapsed();

                let render_start = Instant::now();
                let metrics = SceneMetrics::from_playfield(
                    &scene.playfield,
                    screen_width,
                    screen_height,
                );
                draw_playfield(&scene.playfield, &metrics);
                for sprite in &scene.sprites {
                    draw_sprite(sprite, &metrics);
                }
                draw_score(&scene, &metrics);
                if let Some(banner) = &scene.banner {
                    draw_banner(banner, &metrics);
                }
                let render_duration = render_start.elapsed();

                let fps_metrics = fps_counter.record_frame(FrameBreakdown {
                    frame: frame_dt,
                    update: update_duration,
                    render: render_duration,
                });
                if show_fps {
                    if let Some(FpsMetrics {
                        per_second,
                        avg_update,
                        avg_render,
                    }) = fps_metrics
                    {
                        log::info!(
                            "FPS: {:.2} | update: {:>6.2}ms render: {:>6.2}ms",
                            per_second,
                            avg_update.as_secs_f64() * 1_000.0,
                            avg_render.as_secs_f64() * 1_000.0,
                        );
                    }
                }

                macroquad::window::next_frame().await;
            }
        });

        Ok(())
    }
}

/// Maps world coordinates (origin bottom-left, y up) onto the screen.
#[derive(Clone, Copy, Debug, PartialEq)]
struct SceneMetrics {
    scale: f32,
    offset_x: f32,
    offset_y: f32,
    world_height: f32,
}

impl SceneMetrics {
    fn from_playfield(
        playfield: &PlayfieldPresentation,
        screen_width: f32,
        screen_height: f32,
    ) -> Self {
        let world_width = playfield.width();
        let world_height = playfield.height();
        let scale = if world_width <= f32::EPSILON || world_height <= f32::EPSILON {
            1.0
        } else {
            (screen_width / world_width).min(screen_height / world_height)
        };

        Self {
            scale,
            offset_x: ((screen_width - world_width * scale) * 0.5).max(0.0),
            offset_y: ((screen_height - world_height * scale) * 0.5).max(0.0),
            world_height,
        }
    }

    fn world_to_screen(&self, world: Vec2) -> Vec2 {
        Vec2::new(
            self.offset_x + world.x * self.scale,
            self.offset_y + (self.world_height - world.y) * self.scale,
        )
    }

    fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        Vec2::new(
            (screen.x - self.offset_x) / self.scale,
            self.world_height - (screen.y - self.offset_y) / self.scale,
        )
    }
}

/// Arrow keys held during a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct ArrowKeys {
    left: bool,
    right: bool,
    up: bool,
    down: bool,
}

impl ArrowKeys {
    fn poll() -> Self {
        Self {
            left: is_key_down(KeyCode::Left),
            right: is_key_down(KeyCode::Right),
            up: is_key_down(KeyCode::Up),
            down: is_key_down(KeyCode::Down),
        }
    }

    // Device axes are rotated a quarter turn against the landscape screen:
    // the x reading steers vertically and the y reading steers horizontally.
    // Like a real accelerometer the keyboard always reports; no key held is a
    // level board.
    fn tilt(self, strength: f32) -> Vec2 {
        let axis = |positive: bool, negative: bool| match (positive, negative) {
            (true, false) => strength,
            (false, true) => -strength,
            _ => 0.0,
        };
        Vec2::new(axis(self.up, self.down), axis(self.left, self.right))
    }
}

fn gather_frame_input(
    playfield: &PlayfieldPresentation,
    metrics: &SceneMetrics,
    tilt_strength: f32,
) -> FrameInput {
    let pointer = if is_mouse_button_down(MouseButton::Left) {
        let (cursor_x, cursor_y) = mouse_position();
        Some(Vec2::new(cursor_x, cursor_y))
    } else {
        None
    };
    frame_input_from_observations(
        playfield,
        metrics,
        pointer,
        ArrowKeys::poll(),
        tilt_strength,
    )
}

fn frame_input_from_observations(
    playfield: &PlayfieldPresentation,
    metrics: &SceneMetrics,
    pointer: Option<Vec2>,
    keys: ArrowKeys,
    tilt_strength: f32,
) -> FrameInput {
    let pointer_world = if metrics.scale <= f32::EPSILON {
        None
    } else {
        pointer.map(|screen| playfield.clamp_world_position(metrics.screen_to_world(screen)))
    };

    FrameInput {
        pointer_world,
        tilt: Some(keys.tilt(tilt_strength)),
    }
}

fn kind_color(kind: TileKind) -> Color {
    match kind {
        TileKind::Player => Color::from_rgb_u8(0xd8, 0xdc, 0xe6),
        TileKind::Wall => Color::from_rgb_u8(0x5b, 0x4a, 0x3a),
        TileKind::Vortex => Color::from_rgb_u8(0x6a, 0x2c, 0x91),
        TileKind::Star => Color::from_rgb_u8(0xff, 0xc1, 0x07),
        TileKind::Teleport => Color::from_rgb_u8(0x1e, 0xb8, 0xd0),
        TileKind::Finish => Color::from_rgb_u8(0x2f, 0x95, 0x32),
        TileKind::Space => Color::new(0.0, 0.0, 0.0, 0.0),
    }
}

fn draw_playfield(playfield: &PlayfieldPresentation, metrics: &SceneMetrics) {
    let top_left = metrics.world_to_screen(Vec2::new(0.0, playfield.height()));
    macroquad::shapes::draw_rectangle(
        top_left.x,
        top_left.y,
        playfield.width() * metrics.scale,
        playfield.height() * metrics.scale,
        to_macroquad_color(playfield.background),
    );
}

fn draw_sprite(sprite: &SpriteInstance, metrics: &SceneMetrics) {
    let transform = sprite.transform;
    let centre = metrics.world_to_screen(transform.position);
    let size = sprite.size * transform.scale * metrics.scale;
    let radius = size.x.min(size.y) * 0.5;
    let base = kind_color(sprite.kind).with_opacity(transform.alpha);
    let fill = to_macroquad_color(base);
    let rotation = -transform.rotation.to_degrees();

    match sprite.kind {
        TileKind::Wall => {
            macroquad::shapes::draw_rectangle(
                centre.x - size.x * 0.5,
                centre.y - size.y * 0.5,
                size.x,
                size.y,
                fill,
            );
            macroquad::shapes::draw_rectangle_lines(
                centre.x - size.x * 0.5,
                centre.y - size.y * 0.5,
                size.x,
                size.y,
                2.0,
                to_macroquad_color(base.lighten(0.3)),
            );
        }
        TileKind::Vortex => {
            macroquad::shapes::draw_poly(centre.x, centre.y, 6, radius * 0.9, rotation, fill);
            macroquad::shapes::draw_poly(
                centre.x,
                centre.y,
                3,
                radius * 0.5,
                rotation * 2.0,
                to_macroquad_color(base.lighten(0.4)),
            );
        }
        TileKind::Star => {
            macroquad::shapes::draw_poly(centre.x, centre.y, 5, radius * 0.6, rotation, fill);
            macroquad::shapes::draw_poly(
                centre.x,
                centre.y,
                5,
                radius * 0.6,
                rotation + 36.0,
                fill,
            );
        }
        TileKind::Teleport => {
            macroquad::shapes::draw_circle_lines(centre.x, centre.y, radius * 0.85, 4.0, fill);
            macroquad::shapes::draw_circle(
                centre.x,
                centre.y,
                radius * 0.45,
                to_macroquad_color(base.lighten(0.5)),
            );
        }
        TileKind::Finish => {
            macroquad::shapes::draw_circle(centre.x, centre.y, radius * 0.9, fill);
            macroquad::shapes::draw_circle_lines(
                centre.x,
                centre.y,
                radius * 0.9,
                3.0,
                to_macroquad_color(base.lighten(0.5)),
            );
        }
        TileKind::Player => {
            macroquad::shapes::draw_circle(centre.x, centre.y, radius * 0.94, fill);
            macroquad::shapes::draw_circle(
                centre.x - radius * 0.3,
                centre.y - radius * 0.3,
                radius * 0.2,
                to_macroquad_color(base.lighten(0.8)),
            );
        }
        TileKind::Space => {}
    }
}

fn draw_score(scene: &Scene, metrics: &SceneMetrics) {
    let anchor = metrics.world_to_screen(SCORE_ANCHOR);
    macroquad::text::draw_text(
        &scene.score_label(),
        anchor.x,
        anchor.y,
        SCORE_FONT_SIZE * metrics.scale.max(0.5),
        macroquad::color::WHITE,
    );
}

fn draw_banner(banner: &str, metrics: &SceneMetrics) {
    let font_size = BANNER_FONT_SIZE * metrics.scale.max(0.5);
    let dimensions = macroquad::text::measure_text(banner, None, font_size.round() as u16, 1.0);
    let screen_width = macroquad::window::screen_width();
    let screen_height = macroquad::window::screen_height();
    macroquad::text::draw_text(
        banner,
        (screen_width - dimensions.width) * 0.5,
        (screen_height + dimensions.height) * 0.5,
        font_size,
        macroquad::color::WHITE,
    );
}

fn to_macroquad_color(color: Color) -> macroquad::color::Color {
    macroquad::color::Color::new(color.red, color.green, color.blue, color.alpha)
}
