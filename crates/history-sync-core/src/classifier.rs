//! Title heuristics: season extraction, movie/show classification and
//! search-title normalization. Everything here is a pure function of the title.

use history_sync_models::MediaKind;
use regex::Regex;
use std::sync::LazyLock;

/// How the captured season token is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Numeral {
    Arabic,
    Cjk,
}

/// Season and part markers in priority order. The first capture group holds
/// the number. New markers are added here, nowhere else.
const SEASON_MARKERS: [(&str, Numeral); 6] = [
    (r"[第\s]*(\d+)\s*季", Numeral::Arabic),
    (r"[第\s]*([一二三四五六七八九十两〇零]+)\s*季", Numeral::Cjk),
    (r"[Ss]eason\s*(\d+)", Numeral::Arabic),
    (r"[Ss]\s?(\d+)\b", Numeral::Arabic),
    (r"[第\s]*([一二三四五六七八九十两〇零]+)\s*部", Numeral::Cjk),
    (r"[Pp]art\s*(\d+)", Numeral::Arabic),
];

static SEASON_PATTERNS: LazyLock<Vec<(Regex, Numeral)>> = LazyLock::new(|| {
    SEASON_MARKERS
        .iter()
        .map(|(pattern, numeral)| (Regex::new(pattern).unwrap(), *numeral))
        .collect()
});

// Same markers plus any whitespace in front of them, for stripping.
static STRIP_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    SEASON_MARKERS
        .iter()
        .map(|(pattern, _)| Regex::new(&format!(r"\s*{}", pattern)).unwrap())
        .collect()
});

static SHOW_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(第\s*[一二三四五六七八九十两〇零\d]+\s*话)|TV|电视剧|ドラマ|Season").unwrap()
});

const EDGE_PUNCTUATION: &[char] = &[' ', '·', '-', '—', ':', '：', '(', ')', '（', '）'];

fn cjk_digit(c: char) -> Option<u32> {
    match c {
        '零' | '〇' => Some(0),
        '一' => Some(1),
        '二' | '两' => Some(2),
        '三' => Some(3),
        '四' => Some(4),
        '五' => Some(5),
        '六' => Some(6),
        '七' => Some(7),
        '八' => Some(8),
        '九' => Some(9),
        '十' => Some(10),
        _ => None,
    }
}

/// Convert a CJK numeral between 0 and 99. Numbers are split around `十`
/// into a tens digit (empty means 1) and a units digit (empty means 0).
pub fn cjk_numeral_to_int(s: &str) -> Option<u32> {
    let mut chars = s.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return cjk_digit(c);
    }

    let (tens, units) = s.split_once('十')?;
    if units.contains('十') {
        return None;
    }
    let single = |part: &str, empty: u32| -> u32 {
        let mut it = part.chars();
        match (it.next(), it.next()) {
            (None, _) => empty,
            (Some(c), None) => cjk_digit(c).filter(|d| *d < 10).unwrap_or(0),
            _ => 0,
        }
    };
    Some(single(tens, 1) * 10 + single(units, 0))
}

/// Season number from the first marker whose number parses to a positive
/// value. Markers that fail to parse fall through to the next one.
pub fn extract_season(title: &str) -> Option<u32> {
    SEASON_PATTERNS.iter().find_map(|(re, numeral)| {
        let token = re.captures(title)?.get(1)?.as_str();
        let value = match numeral {
            Numeral::Arabic => token.parse::<u32>().ok(),
            Numeral::Cjk => cjk_numeral_to_int(token),
        };
        value.filter(|n| *n > 0)
    })
}

/// Movie unless the title carries a season, an episode counter or a
/// TV/drama keyword.
pub fn classify_type(title: &str) -> MediaKind {
    if extract_season(title).is_some() || SHOW_MARKERS.is_match(title) {
        MediaKind::Show
    } else {
        MediaKind::Movie
    }
}

/// Strip season/part markers and surrounding separators for catalog search.
pub fn normalize_for_search(title: &str) -> String {
    let mut current = title.to_string();
    // Stripping can bring two fragments together into a new marker
    loop {
        let mut next = current.clone();
        for re in STRIP_PATTERNS.iter() {
            next = re.replace_all(&next, "").into_owned();
        }
        let next = next.trim_matches(EDGE_PUNCTUATION).to_string();
        if next == current {
            return next;
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cjk_numerals() {
        let cases = [
            ("一", Some(1)),
            ("两", Some(2)),
            ("九", Some(9)),
            ("十", Some(10)),
            ("十二", Some(12)),
            ("二十", Some(20)),
            ("二十三", Some(23)),
            ("两十", Some(20)),
            ("九十九", Some(99)),
            ("零", Some(0)),
            ("三四", None),
            ("十十", None),
            ("", None),
        ];
        for (input, expected) in cases {
            assert_eq!(cjk_numeral_to_int(input), expected, "numeral {input:?}");
        }
    }

    #[test]
    fn test_extract_season_table() {
        let cases = [
            ("示例 第二季", Some(2)),
            ("权力的游戏 第八季", Some(8)),
            ("某剧 第十季", Some(10)),
            ("某剧 第十二季", Some(12)),
            ("某剧 第二十季", Some(20)),
            ("某剧 两季", Some(2)),
            ("请回答1988 第1季", Some(1)),
            ("Friends 3季", Some(3)),
            ("Stranger Things Season 4", Some(4)),
            ("The Expanse season4", Some(4)),
            ("Fargo S2", Some(2)),
            ("Fargo S 05", Some(5)),
            ("进击的巨人 第三部", Some(3)),
            ("Dune Part 2", Some(2)),
            ("Dune part2", Some(2)),
            ("肖申克的救赎", None),
            ("", None),
        ];
        for (title, expected) in cases {
            assert_eq!(extract_season(title), expected, "title {title:?}");
        }
    }

    #[test]
    fn test_cjk_season_range() {
        let digits = ["", "一", "二", "三", "四", "五", "六", "七", "八", "九"];
        for n in 1..=99u32 {
            let tens = n / 10;
            let units = n % 10;
            let numeral = match tens {
                0 => digits[units as usize].to_string(),
                1 => format!("十{}", digits[units as usize]),
                _ => format!("{}十{}", digits[tens as usize], digits[units as usize]),
            };
            let title = format!("测试 第{}季", numeral);
            assert_eq!(extract_season(&title), Some(n), "title {title:?}");
        }
    }

    #[test]
    fn test_zero_season_falls_through() {
        // 第0季 is not a season; the later Part marker still applies
        assert_eq!(extract_season("某剧 第0季 Part 2"), Some(2));
        assert_eq!(extract_season("某剧 第零季"), None);
    }

    #[test]
    fn test_classify_type() {
        assert_eq!(classify_type("示例 第二季"), MediaKind::Show);
        assert_eq!(classify_type("Fargo S2"), MediaKind::Show);
        assert_eq!(classify_type("某动画 第12话"), MediaKind::Show);
        assert_eq!(classify_type("某动画 第 十二 话"), MediaKind::Show);
        assert_eq!(classify_type("Some TV Special"), MediaKind::Show);
        assert_eq!(classify_type("some tv"), MediaKind::Show);
        assert_eq!(classify_type("Season"), MediaKind::Show);
        assert_eq!(classify_type("the final season"), MediaKind::Show);
        assert_eq!(classify_type("国产电视剧"), MediaKind::Show);
        assert_eq!(classify_type("半沢直樹 ドラマ"), MediaKind::Show);
        assert_eq!(classify_type("肖申克的救赎"), MediaKind::Movie);
        assert_eq!(classify_type(""), MediaKind::Movie);
    }

    #[test]
    fn test_season_marker_always_show() {
        for title in ["A 第3季", "B Season 1", "C 第二部", "D Part 4", "E s1"] {
            assert_eq!(classify_type(title), MediaKind::Show, "title {title:?}");
        }
    }

    #[test]
    fn test_normalize_for_search() {
        let cases = [
            ("示例 第二季", "示例"),
            ("Stranger Things Season 4", "Stranger Things"),
            ("Fargo S2", "Fargo"),
            ("沙丘：第二部", "沙丘"),
            ("Dune: Part 2", "Dune"),
            ("请回答1988 第1季 ", "请回答1988"),
            ("（某剧）", "某剧"),
            ("肖申克的救赎", "肖申克的救赎"),
            ("", ""),
        ];
        for (title, expected) in cases {
            assert_eq!(normalize_for_search(title), expected, "title {title:?}");
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let titles = [
            "示例 第二季",
            "Fargo S2",
            "S第2季1",
            "— Part 3 —",
            "某剧 第十二季 (2019)",
            "Season 1: Season 2",
            "肖申克的救赎",
            "",
        ];
        for title in titles {
            let once = normalize_for_search(title);
            assert_eq!(normalize_for_search(&once), once, "title {title:?}");
        }
    }
}
