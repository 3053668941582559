use crate::shared::TrackCell;
use looptty::TrackState;
use looptty::audio::NUM_TRACKS;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use ratatui::Frame;

// one cell per track, coloured by state; the current track gets a thick border
pub fn draw_track_row(
    frame: &mut Frame,
    area: Rect,
    tracks: &[TrackCell; NUM_TRACKS],
    blink_on: bool,
) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, NUM_TRACKS as u32); NUM_TRACKS])
        .split(area);

    for (idx, (cell, cell_area)) in tracks.iter().zip(cols.iter()).enumerate() {
        let (label, color) = match cell.state {
            TrackState::LoopOn => ("PLAY", Color::Green),
            TrackState::LoopOff => ("MUTE", Color::DarkGray),
            TrackState::Recording if cell.has_phrase => ("REC", Color::Red),
            TrackState::Recording => ("ARM", Color::Yellow),
        };
        // a recording track blinks while it is capturing
        let lit = !(cell.state == TrackState::Recording && cell.has_phrase) || blink_on;
        let mut style = Style::default().fg(if lit { color } else { Color::DarkGray });
        if cell.pressed {
            style = style.add_modifier(Modifier::REVERSED);
        }

        let border = if cell.current { BorderType::Thick } else { BorderType::Plain };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(border)
            .border_style(style)
            .title(format!(" {} ", idx + 1));
        let text = Paragraph::new(Line::from(label).style(style.add_modifier(Modifier::BOLD)))
            .centered()
            .block(block);
        frame.render_widget(text, *cell_area);
    }
}
