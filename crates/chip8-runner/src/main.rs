//! CHIP-8 runner binary.
//!
//! Runs the VM with a winit window and pixels framebuffer, or in
//! headless mode for smoke tests and screenshots.
//!
//! The window repaints at roughly 60 Hz; each repaint runs however many
//! instructions the per-cycle delay allows for one frame (the delay is a
//! pacing knob, not part of the VM's contract). A VM fault stops the run
//! and is the only diagnostic printed.

mod audio;
mod capture;
mod keymap;

use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};

use emu_chip8::{Chip8, FB_HEIGHT, FB_WIDTH};
use pixels::{Pixels, SurfaceTexture};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::audio::AudioOutput;

/// Repaint cadence for the windowed mode.
const FRAME_DURATION: Duration = Duration::from_micros(16_667);

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

struct CliArgs {
    program_path: Option<PathBuf>,
    /// Per-instruction delay in milliseconds.
    delay_ms: u64,
    /// Window scale factor.
    scale: u32,
    verbose: bool,
    headless: bool,
    /// Instructions to run in headless mode.
    steps: u64,
    screenshot_path: Option<PathBuf>,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        program_path: None,
        delay_ms: 1,
        scale: 10,
        verbose: false,
        headless: false,
        steps: 10_000,
        screenshot_path: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--delay" | "-d" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.delay_ms = s.parse().unwrap_or(1).max(1);
                }
            }
            "--scale" | "-s" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.scale = s.parse().unwrap_or(10).max(1);
                }
            }
            "--verbose" | "-v" => {
                cli.verbose = true;
            }
            "--headless" => {
                cli.headless = true;
            }
            "--steps" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.steps = s.parse().unwrap_or(10_000);
                }
            }
            "--screenshot" => {
                i += 1;
                cli.screenshot_path = args.get(i).map(PathBuf::from);
            }
            "--help" | "-h" => {
                eprintln!("Usage: chip8-runner [OPTIONS] <program.ch8>");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  --delay <ms>         Per-instruction delay [default: 1]");
                eprintln!("  --scale <n>          Window scale factor [default: 10]");
                eprintln!("  --verbose            Extra load diagnostics");
                eprintln!("  --headless           Run without a window");
                eprintln!("  --steps <n>          Instructions to run headless [default: 10000]");
                eprintln!("  --screenshot <file>  Save a PNG screenshot (headless)");
                process::exit(0);
            }
            other if !other.starts_with('-') => {
                cli.program_path = Some(PathBuf::from(other));
            }
            other => {
                eprintln!("Unknown argument: {other}");
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

// ---------------------------------------------------------------------------
// Headless mode
// ---------------------------------------------------------------------------

fn run_headless(cli: &CliArgs) {
    let mut vm = make_vm(cli);

    for _ in 0..cli.steps {
        if vm.is_waiting_for_key() {
            eprintln!("VM is waiting for a key press; stopping headless run");
            break;
        }
        if let Err(e) = vm.step() {
            eprintln!("VM fault: {e}");
            process::exit(1);
        }
    }

    if let Some(ref path) = cli.screenshot_path {
        if let Err(e) = capture::save_screenshot(&vm, path) {
            eprintln!("Screenshot error: {e}");
            process::exit(1);
        }
        eprintln!("Screenshot saved to {}", path.display());
    }
}

// ---------------------------------------------------------------------------
// Windowed mode (winit + pixels)
// ---------------------------------------------------------------------------

struct App {
    vm: Chip8,
    scale: u32,
    /// Instructions per repaint, derived from the per-cycle delay.
    steps_per_frame: u64,
    window: Option<&'static Window>,
    pixels: Option<Pixels<'static>>,
    audio: Option<AudioOutput>,
    last_frame_time: Instant,
}

impl App {
    fn new(vm: Chip8, cli: &CliArgs) -> Self {
        let frame_ms = FRAME_DURATION.as_millis() as u64;
        Self {
            vm,
            scale: cli.scale,
            steps_per_frame: (frame_ms / cli.delay_ms).max(1),
            window: None,
            pixels: None,
            audio: AudioOutput::new(),
            last_frame_time: Instant::now(),
        }
    }

    fn handle_key(&mut self, keycode: KeyCode, pressed: bool) {
        if let Some(key) = keymap::map_keycode(keycode) {
            if pressed {
                self.vm.key_down(key);
            } else {
                self.vm.key_up(key);
            }
        }
    }

    /// Run one frame's worth of instructions.
    ///
    /// Returns false on a VM fault (after reporting it).
    fn run_frame(&mut self) -> bool {
        for _ in 0..self.steps_per_frame {
            // Parked on the key-wait instruction: stepping is a no-op,
            // so don't spin the budget down
            if self.vm.is_waiting_for_key() {
                break;
            }
            if let Err(e) = self.vm.step() {
                eprintln!("VM fault: {e}");
                return false;
            }
        }

        if self.vm.take_beep() {
            if let Some(audio) = self.audio.as_mut() {
                audio.beep();
            }
        }

        true
    }

    fn update_pixels(&mut self) {
        let Some(pixels) = self.pixels.as_mut() else {
            return;
        };

        let fb = self.vm.framebuffer().pixels();
        let frame = pixels.frame_mut();

        for (i, &on) in fb.iter().enumerate() {
            let level = if on == 1 { 0xFF } else { 0x00 };
            let offset = i * 4;
            frame[offset] = level;
            frame[offset + 1] = level;
            frame[offset + 2] = level;
            frame[offset + 3] = 0xFF;
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_size = winit::dpi::LogicalSize::new(
            FB_WIDTH as u32 * self.scale,
            FB_HEIGHT as u32 * self.scale,
        );
        let attrs = WindowAttributes::default()
            .with_title("CHIP-8")
            .with_inner_size(window_size)
            .with_resizable(false);

        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window: &'static Window = Box::leak(Box::new(window));
                let inner = window.inner_size();
                let surface = SurfaceTexture::new(inner.width, inner.height, window);
                match Pixels::new(FB_WIDTH as u32, FB_HEIGHT as u32, surface) {
                    Ok(pixels) => {
                        self.pixels = Some(pixels);
                    }
                    Err(e) => {
                        eprintln!("Failed to create pixels: {e}");
                        event_loop.exit();
                        return;
                    }
                }
                self.window = Some(window);
            }
            Err(e) => {
                eprintln!("Failed to create window: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(keycode) = event.physical_key {
                    if keycode == KeyCode::Escape && event.state == ElementState::Pressed {
                        event_loop.exit();
                        return;
                    }
                    self.handle_key(keycode, event.state == ElementState::Pressed);
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                if now.duration_since(self.last_frame_time) >= FRAME_DURATION {
                    if !self.run_frame() {
                        event_loop.exit();
                        return;
                    }
                    self.update_pixels();
                    self.last_frame_time = now;
                }

                if let Some(pixels) = self.pixels.as_ref() {
                    if let Err(e) = pixels.render() {
                        eprintln!("Render error: {e}");
                        event_loop.exit();
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window {
            window.request_redraw();
        }
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn make_vm(cli: &CliArgs) -> Chip8 {
    let program_path = cli.program_path.as_ref().unwrap_or_else(|| {
        eprintln!("No program specified. Usage: chip8-runner [OPTIONS] <program.ch8>");
        process::exit(1);
    });

    let program = match std::fs::read(program_path) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Failed to read program {}: {e}", program_path.display());
            process::exit(1);
        }
    };

    match Chip8::new(&program) {
        Ok(vm) => {
            eprintln!("Loaded program: {}", program_path.display());
            if cli.verbose {
                eprintln!("  {} bytes at 0x200", program.len());
            }
            vm
        }
        Err(e) => {
            eprintln!("Failed to load program: {e}");
            process::exit(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    let cli = parse_args();

    if cli.headless {
        run_headless(&cli);
        return;
    }

    let vm = make_vm(&cli);
    let mut app = App::new(vm, &cli);

    let event_loop = match EventLoop::new() {
        Ok(el) => el,
        Err(e) => {
            eprintln!("Failed to create event loop: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = event_loop.run_app(&mut app) {
        eprintln!("Event loop error: {e}");
        process::exit(1);
    }
}
