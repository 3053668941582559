use crate::shared::DisplayState;
use super::grid::draw_track_row;
use ratatui::layout::{Layout, Direction, Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use ratatui::Frame;

const HELP: &str = "r/u footswitch  1-6 notes  space play  +/- bpm  [/] bars  ,/. mix  \
    c click  e enable  0 reset  esc quit";

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, blink_on: bool) {
   let sections = Layout::default()
       .direction(Direction::Vertical)
       .constraints([
           Constraint::Length(3), // transport line
           Constraint::Length(3), // loop progress
           Constraint::Min(5), // track cells
           Constraint::Length(2), // status + help
       ])
       .split(area);

   draw_transport(frame, sections[0], state);
   draw_loop_gauge(frame, sections[1], state);
   draw_track_row(frame, sections[2], &state.tracks, blink_on);
   draw_footer(frame, sections[3], state);
}

fn flag(label: &str, on: bool) -> Span<'_> {
   let style = if on {
       Style::default().fg(Color::Black).bg(Color::Cyan)
   } else {
       Style::default().fg(Color::DarkGray)
   };
   Span::styled(format!(" {label} "), style)
}

fn draw_transport(frame: &mut Frame, area: Rect, state: &DisplayState) {
   let beat = if state.playing { state.bar_beat + 1 } else { 0 };
   let line = Line::from(vec![
       Span::styled(
           format!("{:>5.1} bpm ", state.bpm),
           Style::default().add_modifier(Modifier::BOLD),
       ),
       Span::raw(format!("{}/{}  ", beat, state.beats_per_bar as u32)),
       Span::raw(format!("{} bars  ", state.bars as u32)),
       Span::raw(format!("mix {:>3.0}  ", state.mix)),
       flag(if state.playing { "PLAY" } else { "STOP" }, state.playing),
       Span::raw(" "),
       flag("CLICK", state.click_on),
       Span::raw(" "),
       flag("ON", state.enabled),
       Span::raw(" "),
       flag("MIDI", state.note_control),
   ]);
   let block = Block::default().borders(Borders::ALL).title(" looptty ");
   let widget = Paragraph::new(line).block(block);
   frame.render_widget(widget, area);
}

fn draw_loop_gauge(frame: &mut Frame, area: Rect, state: &DisplayState) {
   let label = if state.free_running {
       format!("free {:.2}s", state.loop_seconds)
   } else {
       format!("beat {}/{}  {:.2}s", state.loop_beat, state.loop_beats, state.loop_seconds)
   };
   let gauge = Gauge::default()
       .block(Block::default().borders(Borders::ALL))
       .gauge_style(Style::default().fg(Color::Green))
       .ratio(state.loop_progress.clamp(0.0, 1.0))
       .label(label);
   frame.render_widget(gauge, area);
}

fn draw_footer(frame: &mut Frame, area: Rect, state: &DisplayState) {
   let lines = vec![
       Line::from(state.display_text.as_str()),
       Line::from(Span::styled(HELP, Style::default().fg(Color::DarkGray))),
   ];
   frame.render_widget(Paragraph::new(lines), area);
}
