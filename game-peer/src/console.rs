use game_core::MatchEvent;
use game_types::{CellCoord, CoinSide, Contestant, MatchSnapshot, TurnPhase};

use crate::coordinator::{CoordinatorEvent, LocalCommand};

pub const HELP: &str = "\
commands:
  find WORD            select a word by typing it
  cells R,C R,C ...    select a run of cells
  bonus                spend stored bonus time
  forfeit              give up the match
  say TEXT             chat with your opponent
  call heads|tails     call the opening coin flip
  start [THEME]        retry a failed match start (hosting side)
  rematch              ask for another match
  vote THEME           vote for the next theme
  quit                 leave the session";

/// Parse one line typed by the user.
pub fn parse_command(line: &str) -> Result<LocalCommand, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match verb.to_ascii_lowercase().as_str() {
        "find" if !rest.is_empty() => Ok(LocalCommand::SelectWord(rest.to_string())),
        "cells" => parse_cells(rest).map(LocalCommand::SelectCells),
        "bonus" => Ok(LocalCommand::SpendBonus),
        "forfeit" => Ok(LocalCommand::Forfeit),
        "say" if !rest.is_empty() => Ok(LocalCommand::Chat(rest.to_string())),
        "call" => rest.parse::<CoinSide>().map(LocalCommand::CallCoin),
        "start" => Ok(LocalCommand::StartMatch {
            theme: (!rest.is_empty()).then(|| rest.to_string()),
        }),
        "rematch" => Ok(LocalCommand::RequestRematch),
        "vote" if !rest.is_empty() => Ok(LocalCommand::VoteTheme(rest.to_string())),
        "quit" | "exit" => Ok(LocalCommand::Quit),
        "" => Err("empty command".to_string()),
        other => Err(format!("unknown or incomplete command '{}'", other)),
    }
}

fn parse_cells(rest: &str) -> Result<Vec<CellCoord>, String> {
    let cells = rest
        .split_whitespace()
        .map(|pair| {
            let (row, col) = pair
                .split_once(',')
                .ok_or_else(|| format!("'{}' is not ROW,COL", pair))?;
            let row = row.trim().parse().map_err(|_| format!("bad row in '{}'", pair))?;
            let col = col.trim().parse().map_err(|_| format!("bad column in '{}'", pair))?;
            Ok(CellCoord::new(row, col))
        })
        .collect::<Result<Vec<_>, String>>()?;

    if cells.is_empty() {
        return Err("no cells given".to_string());
    }
    Ok(cells)
}

pub fn render_board(snapshot: &MatchSnapshot) -> String {
    let mut out = String::new();
    for row in &snapshot.puzzle.grid.cells {
        let line: Vec<String> = row.iter().map(|cell| cell.letter.to_string()).collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }

    let scores: Vec<String> = snapshot.contestants.iter().map(describe_contestant).collect();
    out.push_str(&scores.join("  |  "));
    out.push('\n');

    if let Some(active) = snapshot.active_contestant() {
        let phase = match snapshot.turn.phase {
            TurnPhase::Normal => "turn",
            TurnPhase::Steal => "steal",
        };
        out.push_str(&format!(
            "{}'s {} ({}s left)",
            active.display_name, phase, snapshot.turn.seconds_remaining
        ));
    }
    out
}

fn describe_contestant(contestant: &Contestant) -> String {
    format!(
        "{}: {} words, {}s banked",
        contestant.display_name, contestant.score, contestant.bonus_time_seconds
    )
}

/// A one-line message for the user, or `None` for events rendered elsewhere.
pub fn describe_event(event: &CoordinatorEvent) -> Option<String> {
    let text = match event {
        CoordinatorEvent::PeerIdentified { identity } => {
            format!("Playing against {}", identity.display_name)
        }
        CoordinatorEvent::CoinCallRequested => "Call the coin: call heads|tails".to_string(),
        CoordinatorEvent::CoinFlipResolved { outcome } => format!(
            "Coin landed {:?}; contestant {} opens",
            outcome.result, outcome.winner_index
        ),
        CoordinatorEvent::MatchStarted { theme: Some(theme), .. } => {
            format!("Match started, theme: {}", theme)
        }
        CoordinatorEvent::MatchStarted { .. } => "Match started".to_string(),
        CoordinatorEvent::StartFailed { theme, reason } => {
            format!("Could not start a match on '{}': {}", theme, reason)
        }
        CoordinatorEvent::SelectionFeedback { event } => match event {
            MatchEvent::SelectionMissed { .. } => "Not the word, keep looking".to_string(),
            MatchEvent::SelectionRejected { reason, .. } => {
                format!("Selection rejected: {:?}", reason)
            }
            _ => return None,
        },
        CoordinatorEvent::ActionRefused { error } => format!("Refused: {}", error),
        CoordinatorEvent::ChatReceived { message } => {
            format!("<{}> {}", message.sender_name, message.text)
        }
        CoordinatorEvent::MatchOver { winner_id, final_contestants } => {
            let winner = final_contestants
                .iter()
                .find(|c| c.id == *winner_id)
                .map(|c| c.display_name.as_str())
                .unwrap_or("unknown");
            format!("{} wins! Type 'rematch' to play again", winner)
        }
        CoordinatorEvent::RematchRequested => "Your opponent wants a rematch".to_string(),
        CoordinatorEvent::ThemeVoteOpened { options } => {
            format!("Vote for the next theme: {}", options.join(" / "))
        }
        CoordinatorEvent::ThemeChosen { theme } => format!("Next theme: {}", theme),
        CoordinatorEvent::SessionEnded { error: Some(error) } => format!("Session ended: {}", error),
        CoordinatorEvent::SessionEnded { error: None } => "Session ended".to_string(),
        CoordinatorEvent::StateUpdated { .. } => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command("find  kelp ").unwrap(),
            LocalCommand::SelectWord("kelp".to_string())
        );
        assert_eq!(
            parse_command("cells 0,0 0,1 0,2").unwrap(),
            LocalCommand::SelectCells(vec![
                CellCoord::new(0, 0),
                CellCoord::new(0, 1),
                CellCoord::new(0, 2),
            ])
        );
        assert_eq!(parse_command("start").unwrap(), LocalCommand::StartMatch { theme: None });
        assert_eq!(
            parse_command("start Ocean Life").unwrap(),
            LocalCommand::StartMatch {
                theme: Some("Ocean Life".to_string())
            }
        );
        assert_eq!(
            parse_command("CALL tails").unwrap(),
            LocalCommand::CallCoin(CoinSide::Tails)
        );
        assert_eq!(parse_command("quit").unwrap(), LocalCommand::Quit);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("").is_err());
        assert!(parse_command("find").is_err());
        assert!(parse_command("cells 0;1").is_err());
        assert!(parse_command("cells").is_err());
        assert!(parse_command("call edge").is_err());
        assert!(parse_command("dance").is_err());
    }
}
