use crate::game::state::{Card, SessionState};

const HIDDEN_FACE: &str = "?";

fn face(card: &Card) -> &str {
    if card.is_face_up() {
        &card.content
    } else {
        HIDDEN_FACE
    }
}

fn cell(position: usize, card: &Card) -> String {
    let marker = if card.is_matched { '*' } else { ' ' };
    format!("[{:>2}{}{}]", position + 1, marker, face(card))
}

pub fn render_board(state: &SessionState, columns: usize) -> String {
    let columns = columns.max(1);
    state
        .cards
        .chunks(columns)
        .enumerate()
        .map(|(row, cards)| {
            cards
                .iter()
                .enumerate()
                .map(|(col, card)| cell(row * columns + col, card))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::CardId;

    fn card(position: u32, content: &str, flipped: bool, matched: bool) -> Card {
        Card {
            id: CardId { round: 1, position },
            content: content.to_string(),
            is_flipped: flipped,
            is_matched: matched,
        }
    }

    #[test]
    fn hides_face_down_cards() {
        let state = SessionState {
            cards: vec![
                card(0, "A", false, false),
                card(1, "B", true, false),
                card(2, "C", true, true),
            ],
            ..SessionState::default()
        };
        assert_eq!(render_board(&state, 2), "[ 1 ?] [ 2 B]\n[ 3*C]");
    }
}
