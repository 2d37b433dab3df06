use crate::domain::mapping::{
    MultiLabelDate, ParsedLabel, card_for_zodiac_sign, date_for_labels, find_card,
    parse_label_input, parse_multi_label_input, week_range_for_card,
};
use crate::domain::models::{StackCard, WeekConfig};
use crate::domain::week::{WeekRange, week_range_of};
use crate::domain::zodiac::ZodiacSign;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchOutcome {
    Empty,
    Sign {
        sign: ZodiacSign,
        date_range: String,
        card: Option<StackCard>,
    },
    Week {
        week: u32,
        range: WeekRange,
    },
    Card {
        card: StackCard,
        week: u32,
        range: WeekRange,
    },
    Cards(MultiLabelDate),
    NoMatch,
}

/// Resolves free-text input in order: zodiac name, `#week`, single card,
/// then two or three cards.
pub fn search(
    query: &str,
    stack: &[StackCard],
    year: i32,
    config: &WeekConfig,
    seed: u32,
) -> SearchOutcome {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return SearchOutcome::Empty;
    }

    if let Ok(sign) = trimmed.parse::<ZodiacSign>() {
        return SearchOutcome::Sign {
            sign,
            date_range: sign.date_range(),
            card: card_for_zodiac_sign(sign, stack, seed).cloned(),
        };
    }

    if !stack.is_empty() {
        match parse_label_input(trimmed) {
            Some(ParsedLabel::Week { week }) => {
                return SearchOutcome::Week {
                    week,
                    range: week_range_of(year, week, config.standard),
                };
            }
            Some(label) => {
                if let Some(card) = find_card(stack, &label) {
                    let range = week_range_for_card(card, year, config);
                    return SearchOutcome::Card {
                        card: card.clone(),
                        week: range.week,
                        range: WeekRange {
                            start: range.start,
                            end: range.end,
                        },
                    };
                }
            }
            None => {}
        }
    }

    parse_multi_label_input(trimmed)
        .and_then(|labels| date_for_labels(&labels, stack, year, config))
        .map(SearchOutcome::Cards)
        .unwrap_or(SearchOutcome::NoMatch)
}
