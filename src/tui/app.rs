//! Debugger application state and logic.

use crate::asm::{disassembly, RomImage};
use crate::config::EmulatorConfig;
use crate::devices::Keypad;
use crate::system::{Chip8, SystemError};
use std::collections::HashSet;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::fmt::MakeWriter;

/// Lines of log output kept for the log pane.
const LOG_CAPACITY: usize = 200;

/// How long a typed key stays pressed. Terminals report presses only.
const KEY_HOLD: Duration = Duration::from_millis(120);

/// Debugger application state.
pub struct DebuggerApp {
    /// The machine being debugged.
    pub machine: Chip8,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<u16>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset, in rows of 8 bytes.
    pub mem_scroll: usize,
    /// Most recent log lines, oldest first.
    pub log: Vec<String>,
    /// Instructions per second over the last full second.
    pub ips: u64,
    ips_mark: (Instant, u64),
    resuming: bool,
    held_key: Option<(u8, Instant)>,
    log_buffer: LogBuffer,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(rom: RomImage, config: EmulatorConfig, log_buffer: LogBuffer) -> Result<Self, SystemError> {
        let machine = Chip8::new(rom, config)?;
        let instructions = machine.instructions();

        Ok(Self {
            machine,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: "Ready. Tab: step, Enter: run/pause, Esc: quit.".into(),
            mem_scroll: 0x200 / 8,
            log: Vec::new(),
            ips: 0,
            ips_mark: (Instant::now(), instructions),
            resuming: false,
            held_key: None,
            log_buffer,
        })
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if self.machine.is_stopped() {
            self.status = format!("CPU halted: {:?}", self.machine.cpu.state);
            self.running = false;
            return;
        }

        let pc = self.machine.cpu.regs.pc;
        let text = disassembly(&self.machine.bus, pc, 1)
            .next()
            .map(|(_, text)| text)
            .unwrap_or_default();
        match self.machine.step() {
            Ok(()) if self.machine.is_stopped() => {
                self.status = format!("Stopped at PC={:03X}: {}", pc, text);
                self.running = false;
            }
            Ok(()) => {
                self.status = format!("PC={:03X}: {}", pc, text);
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
    }

    /// Toggle continuous execution.
    pub fn toggle_run(&mut self) {
        self.running = !self.running;
        self.resuming = self.running;
        self.status = if self.running { "Running...".into() } else { "Paused.".into() };
    }

    /// Run one frame's worth of continuous execution.
    pub fn tick(&mut self, frame: Duration) {
        self.release_held_key();
        self.drain_log();
        self.update_ips();

        if !self.running {
            return;
        }

        let per_second = self.machine.config().ticks_per_second as u128;
        let budget = (per_second * frame.as_millis() / 1000).max(1);
        for _ in 0..budget {
            if self.machine.is_stopped() {
                self.running = false;
                self.status = format!("Halted after {} instructions", self.machine.instructions());
                return;
            }

            let pc = self.machine.cpu.regs.pc;
            // A run started on a breakpoint executes it before checking again.
            if self.breakpoints.contains(&pc) && !self.resuming {
                self.running = false;
                self.status = format!("Breakpoint at PC={:03X}", pc);
                return;
            }
            self.resuming = false;

            self.step();
            if !self.running {
                return;
            }
        }
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.machine.cpu.regs.pc;
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={:03X}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={:03X}", pc);
        }
    }

    /// Reset the machine to its initial state.
    pub fn reset(&mut self) {
        self.running = false;
        self.status = match self.machine.reset() {
            Ok(()) => "Reset. Ready.".into(),
            Err(e) => format!("Reset failed: {}", e),
        };
    }

    /// Press a keypad key for a short moment.
    pub fn press_key(&mut self, c: char) {
        if let Some(key) = Keypad::key_for_char(c) {
            self.release_held_key_now();
            self.machine.keypad.press(key);
            self.held_key = Some((key, Instant::now()));
        }
    }

    fn release_held_key(&mut self) {
        if let Some((_, since)) = self.held_key {
            if since.elapsed() >= KEY_HOLD {
                self.release_held_key_now();
            }
        }
    }

    fn release_held_key_now(&mut self) {
        if let Some((key, _)) = self.held_key.take() {
            self.machine.keypad.release(key);
        }
    }

    fn update_ips(&mut self) {
        let (since, count) = self.ips_mark;
        let elapsed = since.elapsed();
        if elapsed >= Duration::from_secs(1) {
            let now = self.machine.instructions();
            self.ips = ((now - count) as f64 / elapsed.as_secs_f64()) as u64;
            self.ips_mark = (Instant::now(), now);
        }
    }

    fn drain_log(&mut self) {
        self.log.extend(self.log_buffer.take_lines());
        if self.log.len() > LOG_CAPACITY {
            let excess = self.log.len() - LOG_CAPACITY;
            self.log.drain(..excess);
        }
    }
}

/// In-memory sink for the debugger's tracing subscriber.
///
/// Subscribers require `Send + Sync` writers, so the buffer sits behind an
/// `Arc<Mutex>` even though the debugger is single-threaded.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// Take all complete lines written so far.
    pub fn take_lines(&self) -> Vec<String> {
        let Ok(mut buf) = self.0.lock() else {
            return Vec::new();
        };
        let Some(end) = buf.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };
        let rest = buf.split_off(end + 1);
        let text = String::from_utf8_lossy(&buf).into_owned();
        *buf = rest;
        text.lines().map(str::to_string).collect()
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = &'a Self;

    fn make_writer(&'a self) -> Self::Writer {
        self
    }
}

impl io::Write for &'_ LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self
            .0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log buffer poisoned"))?;
        inner.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run the debugger with a program.
pub fn run_debugger(rom: RomImage, config: EmulatorConfig) -> io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use tracing::level_filters::LevelFilter;

    let log_buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .without_time()
        .with_ansi(false)
        .with_max_level(LevelFilter::DEBUG)
        .with_writer(log_buffer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let mut app = DebuggerApp::new(rom, config, log_buffer)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let frame = Duration::from_millis(16);

    // Main loop
    loop {
        terminal.draw(|f| {
            super::ui::draw(f, &app);
        })?;

        if event::poll(frame)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Esc => app.should_quit = true,
                        KeyCode::Tab => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Enter => app.toggle_run(),
                        KeyCode::F(9) => app.toggle_breakpoint(),
                        KeyCode::Backspace => app.reset(),
                        KeyCode::Up => app.mem_scroll = app.mem_scroll.saturating_sub(1),
                        KeyCode::Down => {
                            if app.mem_scroll < 0x1000 / 8 - 1 {
                                app.mem_scroll += 1;
                            }
                        }
                        KeyCode::Char(c) => app.press_key(c),
                        _ => {}
                    }
                }
            }
        }

        app.tick(frame);

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}
