//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, List, ListItem},
    style::{Color, Style, Modifier},
};
use crate::cpu::RegisterKind;
use crate::devices::display::{HEIGHT, WIDTH};
use super::app::DebuggerApp;

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(WIDTH as u16 + 2),
            Constraint::Min(30),
        ])
        .split(frame.area());

    // Left side: screen, registers and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEIGHT as u16 / 2 + 2),
            Constraint::Length(9),
            Constraint::Length(3),
            Constraint::Min(4),
        ])
        .split(chunks[0]);

    draw_screen(frame, left_chunks[0], app);
    draw_registers(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);
    draw_log(frame, left_chunks[3], app);

    // Right side: code, memory and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(12),
            Constraint::Length(4),
        ])
        .split(chunks[1]);

    draw_disassembly(frame, right_chunks[0], app);
    draw_memory(frame, right_chunks[1], app);
    draw_help(frame, right_chunks[2]);
}

/// Draw the display, two pixel rows per text row.
fn draw_screen(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let rows: Vec<&[bool]> = app.machine.display.rows().collect();

    let lines: Vec<Line> = rows
        .chunks(2)
        .map(|pair| {
            let top = pair[0];
            let bottom = pair.get(1).copied().unwrap_or_default();
            let text: String = (0..WIDTH)
                .map(|x| {
                    let up = top.get(x).copied().unwrap_or(false);
                    let down = bottom.get(x).copied().unwrap_or(false);
                    match (up, down) {
                        (true, true) => '█',
                        (true, false) => '▀',
                        (false, true) => '▄',
                        (false, false) => ' ',
                    }
                })
                .collect();
            Line::from(text)
        })
        .collect();

    let paragraph = Paragraph::new(lines)
        .style(Style::default().fg(Color::Green))
        .block(Block::default()
            .title(format!(" {} ", app.machine.rom().name))
            .borders(Borders::ALL));

    frame.render_widget(paragraph, area);
}

/// Draw disassembly from the current PC.
fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let pc = app.machine.cpu.regs.pc;

    let items: Vec<ListItem> = app
        .machine
        .disassembly()
        .map(|(addr, instr)| {
            let is_current = addr == pc;
            let prefix = if is_current { "▶ " } else { "  " };
            let bp = if app.breakpoints.contains(&addr) { "●" } else { " " };
            let text = format!("{} {}{:03X}: {}", bp, prefix, addr, instr);

            let style = if is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.breakpoints.contains(&addr) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };

            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Disassembly ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(list, area);
}

/// Draw the register snapshot.
fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let snapshot = app.machine.registers();

    let special: Vec<Span> = snapshot
        .iter()
        .filter(|r| r.kind != RegisterKind::GeneralPurpose)
        .flat_map(|r| {
            let digits = r.width as usize * 2;
            let color = match r.kind {
                RegisterKind::ProgramCounter => Color::Yellow,
                RegisterKind::Timer => Color::Magenta,
                _ => Color::White,
            };
            [
                Span::raw(format!("{}: ", r.name)),
                Span::styled(format!("{:0width$X}  ", r.value, width = digits), Style::default().fg(color)),
            ]
        })
        .collect();

    let general: Vec<Line> = snapshot
        .iter()
        .filter(|r| r.kind == RegisterKind::GeneralPurpose)
        .collect::<Vec<_>>()
        .chunks(4)
        .map(|row| {
            Line::from(row.iter().map(|r| {
                let style = if r.value != 0 {
                    Style::default().fg(Color::White)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                Span::styled(format!("{}: {:02X}   ", r.name, r.value), style)
            }).collect::<Vec<_>>())
        })
        .collect();

    let mut content = vec![Line::from(special)];
    content.extend(general);
    content.push(Line::from(vec![
        Span::raw("Instructions: "),
        Span::styled(format!("{}", app.machine.instructions()), Style::default().fg(Color::Cyan)),
        Span::raw("   IPS: "),
        Span::styled(format!("{}", app.ips), Style::default().fg(Color::Cyan)),
        Span::raw("   State: "),
        Span::styled(format!("{:?}", app.machine.cpu.state),
            if app.machine.cpu.is_running() {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Red)
            }),
    ]));
    content.push(Line::from(format!("Stack: {:03X?}", app.machine.cpu.call_stack())));

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// Draw memory view, eight bytes per row.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let bus = &app.machine.bus;
    let index = app.machine.cpu.regs.index();
    let pc = app.machine.cpu.regs.pc;

    let items: Vec<ListItem> = (app.mem_scroll..app.mem_scroll + visible_rows)
        .map(|row| row * 8)
        .take_while(|base| *base < bus.size() as usize)
        .map(|base| {
            let bytes: String = (base..base + 8)
                .map(|addr| match bus.read_byte(addr as u16) {
                    Ok(b) => format!("{:02X} ", b),
                    Err(_) => "-- ".to_string(),
                })
                .collect();
            let text = format!("{:03X}: {}", base, bytes);

            let contains = |addr: u16| (base..base + 8).contains(&(addr as usize));
            let style = if contains(pc) {
                Style::default().fg(Color::Yellow)
            } else if contains(index) {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::White)
            };

            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Memory ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(list, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw the tail of the captured log.
fn draw_log(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible = (area.height as usize).saturating_sub(2);
    let start = app.log.len().saturating_sub(visible);
    let lines: Vec<Line> = app.log[start..]
        .iter()
        .map(|l| Line::from(l.as_str()))
        .collect();

    let log = Paragraph::new(lines)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default()
            .title(" Log ")
            .borders(Borders::ALL));

    frame.render_widget(log, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("Tab: Step  Enter: Run/Pause  F9: Breakpoint  Bksp: Reset"),
        Line::from("0-9 a-f: Keypad  ↑↓: Scroll memory  Esc: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}
