//! Console formatting for resolved lobby details.
//!
//! Reports are product output on stdout, printed once per newly completed
//! lobby. Diagnostics stay on stderr via tracing.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::core::types::LobbyDetails;

/// Render one lobby report, calling out configured known players.
pub fn render(details: &LobbyDetails, friends: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- Lobby Found ---");
    let _ = writeln!(
        out,
        "Match ID: {} (Lobby ID: {})",
        details.match_id, details.lobby_id
    );
    let _ = writeln!(out, "In game for: {}", fmt_game_time(details.game_time_secs));
    let _ = writeln!(out, "Average MMR: {}", details.average_mmr);

    let mut friend_found = false;
    for player in &details.players {
        if let Some(name) = friends.get(&player.account_id.to_string()) {
            let _ = writeln!(out, "Player in match: {name} (ID: {})", player.account_id);
            friend_found = true;
        }
    }
    if !friend_found {
        let _ = writeln!(out, "No known friends found in this lobby.");
    }
    out.push_str("-------------------");
    out
}

fn fmt_game_time(secs: u32) -> String {
    let minutes = secs / 60;
    let seconds = secs % 60;
    format!("{minutes}m {seconds}s")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::LobbyPlayer;

    fn details() -> LobbyDetails {
        LobbyDetails {
            lobby_id: 12345,
            match_id: 67890,
            game_time_secs: 754,
            average_mmr: 5200,
            players: vec![
                LobbyPlayer { account_id: 42 },
                LobbyPlayer { account_id: 77 },
            ],
        }
    }

    #[test]
    fn report_names_known_players() {
        let mut friends = BTreeMap::new();
        friends.insert("42".to_string(), "alice".to_string());

        let report = render(&details(), &friends);
        assert!(report.contains("Match ID: 67890 (Lobby ID: 12345)"));
        assert!(report.contains("In game for: 12m 34s"));
        assert!(report.contains("Average MMR: 5200"));
        assert!(report.contains("Player in match: alice (ID: 42)"));
        assert!(!report.contains("No known friends"));
    }

    #[test]
    fn report_notes_when_no_friends_match() {
        let report = render(&details(), &BTreeMap::new());
        assert!(report.contains("No known friends found in this lobby."));
    }
}
