use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Element {
    Fire,
    Earth,
    Air,
    Water,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ZodiacSign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

struct SignSpan {
    start: (u32, u32),
    end: (u32, u32),
}

impl ZodiacSign {
    /// Table order; the seeded position hash depends on it.
    pub const ALL: [ZodiacSign; 12] = [
        Self::Aries,
        Self::Taurus,
        Self::Gemini,
        Self::Cancer,
        Self::Leo,
        Self::Virgo,
        Self::Libra,
        Self::Scorpio,
        Self::Sagittarius,
        Self::Capricorn,
        Self::Aquarius,
        Self::Pisces,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Aries => "Aries",
            Self::Taurus => "Taurus",
            Self::Gemini => "Gemini",
            Self::Cancer => "Cancer",
            Self::Leo => "Leo",
            Self::Virgo => "Virgo",
            Self::Libra => "Libra",
            Self::Scorpio => "Scorpio",
            Self::Sagittarius => "Sagittarius",
            Self::Capricorn => "Capricorn",
            Self::Aquarius => "Aquarius",
            Self::Pisces => "Pisces",
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Self::Aries => '♈',
            Self::Taurus => '♉',
            Self::Gemini => '♊',
            Self::Cancer => '♋',
            Self::Leo => '♌',
            Self::Virgo => '♍',
            Self::Libra => '♎',
            Self::Scorpio => '♏',
            Self::Sagittarius => '♐',
            Self::Capricorn => '♑',
            Self::Aquarius => '♒',
            Self::Pisces => '♓',
        }
    }

    pub fn element(self) -> Element {
        match self {
            Self::Aries | Self::Leo | Self::Sagittarius => Element::Fire,
            Self::Taurus | Self::Virgo | Self::Capricorn => Element::Earth,
            Self::Gemini | Self::Libra | Self::Aquarius => Element::Air,
            Self::Cancer | Self::Scorpio | Self::Pisces => Element::Water,
        }
    }

    fn span(self) -> SignSpan {
        let (start, end) = match self {
            Self::Aries => ((3, 21), (4, 19)),
            Self::Taurus => ((4, 20), (5, 20)),
            Self::Gemini => ((5, 21), (6, 20)),
            Self::Cancer => ((6, 21), (7, 22)),
            Self::Leo => ((7, 23), (8, 22)),
            Self::Virgo => ((8, 23), (9, 22)),
            Self::Libra => ((9, 23), (10, 22)),
            Self::Scorpio => ((10, 23), (11, 21)),
            Self::Sagittarius => ((11, 22), (12, 21)),
            Self::Capricorn => ((12, 22), (1, 19)),
            Self::Aquarius => ((1, 20), (2, 18)),
            Self::Pisces => ((2, 19), (3, 20)),
        };
        SignSpan { start, end }
    }

    /// `"Mar 21 - Apr 19"`
    pub fn date_range(self) -> String {
        const MONTHS: [&str; 12] = [
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ];
        let span = self.span();
        format!(
            "{} {} - {} {}",
            MONTHS[span.start.0 as usize - 1],
            span.start.1,
            MONTHS[span.end.0 as usize - 1],
            span.end.1
        )
    }

    /// Sign for a 1-based month/day; out-of-range input falls back to Aries.
    pub fn for_month_day(month: u32, day: u32) -> Self {
        Self::ALL
            .into_iter()
            .find(|sign| {
                let span = sign.span();
                (month == span.start.0 && day >= span.start.1)
                    || (month == span.end.0 && day <= span.end.1)
            })
            .unwrap_or(Self::Aries)
    }
}

impl FromStr for ZodiacSign {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|sign| sign.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown zodiac sign: {trimmed}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_boundaries_follow_table() {
        assert_eq!(ZodiacSign::for_month_day(3, 21), ZodiacSign::Aries);
        assert_eq!(ZodiacSign::for_month_day(3, 20), ZodiacSign::Pisces);
        assert_eq!(ZodiacSign::for_month_day(12, 31), ZodiacSign::Capricorn);
        assert_eq!(ZodiacSign::for_month_day(1, 19), ZodiacSign::Capricorn);
        assert_eq!(ZodiacSign::for_month_day(1, 20), ZodiacSign::Aquarius);
        assert_eq!(ZodiacSign::for_month_day(13, 1), ZodiacSign::Aries);
    }

    #[test]
    fn from_str_is_case_insensitive() {
        assert_eq!("  scorpio ".parse::<ZodiacSign>(), Ok(ZodiacSign::Scorpio));
        assert!("Ophiuchus".parse::<ZodiacSign>().is_err());
    }

    #[test]
    fn table_metadata() {
        assert_eq!(ZodiacSign::Capricorn.index(), 9);
        assert_eq!(ZodiacSign::Leo.element(), Element::Fire);
        assert_eq!(ZodiacSign::Aries.date_range(), "Mar 21 - Apr 19");
        assert_eq!(ZodiacSign::Pisces.symbol(), '♓');
    }
}
