//! Click anywhere to drop a sphere onto the ground.
//!
//! Left drag orbits, right drag pans, the wheel zooms.
//! R toggles between the full and a half-size viewport, ESC quits.
//!
//! Run with: `cargo run --example click_spheres --release -- --seed 7`
//! Set `RUST_LOG=debug` to see every spawn.

use clap::Parser;
use embedded_graphics::mono_font::{ascii::FONT_6X10, MonoTextStyle};
use embedded_graphics::text::Text;
use embedded_graphics_core::pixelcolor::{Rgb565, RgbColor};
use embedded_graphics_core::prelude::*;
use embedded_graphics_simulator::sdl2::{Keycode, MouseButton};
use embedded_graphics_simulator::{OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window};
use log::info;
use sphere_drop::app::SphereDrop;
use sphere_drop::config::SceneConfig;
use sphere_drop::input::{InputEvent, PointerButton};
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(about = "Click to drop spheres onto a shadowed ground plane")]
struct Args {
    /// Window width in pixels
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Window height in pixels
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Pixel scale of the simulator window
    #[arg(long, default_value_t = 1)]
    scale: u32,

    /// Seed for sphere colors
    #[arg(long)]
    seed: Option<u64>,

    /// Physics substeps per frame
    #[arg(long, default_value_t = 4)]
    substeps: u32,
}

fn pointer_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Primary),
        MouseButton::Right => Some(PointerButton::Secondary),
        _ => None,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = SceneConfig::default().with_viewport(args.width, args.height);
    config.seed = args.seed;
    config.substeps = args.substeps.max(1);

    let mut display = SimulatorDisplay::<Rgb565>::new(Size::new(args.width, args.height));
    let output_settings = OutputSettingsBuilder::new().scale(args.scale.max(1)).build();
    let mut window = Window::new("Click to drop spheres", &output_settings);

    let mut app = SphereDrop::new(config)?;
    let text_style = MonoTextStyle::new(&FONT_6X10, Rgb565::WHITE);
    let mut half_size = false;

    info!("click to drop a sphere, R toggles viewport size, ESC quits");

    display.clear(Rgb565::BLACK)?;
    window.update(&display);

    'running: loop {
        let events: Vec<SimulatorEvent> = window.events().collect();
        for event in events {
            let input = match event {
                SimulatorEvent::Quit => break 'running,
                SimulatorEvent::KeyDown { keycode, .. } => match keycode {
                    Keycode::Escape => break 'running,
                    Keycode::R => {
                        half_size = !half_size;
                        let (w, h) = if half_size {
                            (args.width / 2, args.height / 2)
                        } else {
                            (args.width, args.height)
                        };
                        display.clear(Rgb565::BLACK)?;
                        Some(InputEvent::Resize { width: w, height: h })
                    }
                    _ => None,
                },
                SimulatorEvent::MouseButtonDown { mouse_btn, point } => {
                    pointer_button(mouse_btn).map(|button| InputEvent::PointerDown {
                        x: point.x as f32,
                        y: point.y as f32,
                        button,
                    })
                }
                SimulatorEvent::MouseButtonUp { mouse_btn, point } => {
                    if let Some(button) = pointer_button(mouse_btn) {
                        let (x, y) = (point.x as f32, point.y as f32);
                        app.handle_event(InputEvent::PointerUp { x, y, button }, &mut display)?;
                        (button == PointerButton::Primary).then_some(InputEvent::Click { x, y })
                    } else {
                        None
                    }
                }
                SimulatorEvent::MouseMove { point } => Some(InputEvent::PointerMove {
                    x: point.x as f32,
                    y: point.y as f32,
                }),
                // SDL reports positive y for scrolling up, the opposite of deltaY
                SimulatorEvent::MouseWheel { scroll_delta, .. } => Some(InputEvent::Wheel {
                    delta: -scroll_delta.y as f32,
                }),
                _ => None,
            };

            if let Some(input) = input {
                app.handle_event(input, &mut display)?;
            }
        }

        app.frame(&mut display)?;

        Text::new(app.stats().text(), Point::new(10, 15), text_style).draw(&mut display)?;

        window.update(&display);
        thread::sleep(Duration::from_millis(16));
    }

    Ok(())
}
