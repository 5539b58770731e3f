//! 이름 정규화 및 매칭 정책.
//!
//! 소스마다 같은 회사를 다르게 표기하므로 ("ABC Ltd", "ABC Limited IPO",
//! "ABC IPO - Closing Today") 비교 가능한 키로 변환합니다.
//!
//! 이름 비교는 반드시 이 모듈을 통해서만 수행합니다.
//!
//! | 정책 | 규칙 | 용도 |
//! |---|---|---|
//! | [`MatchPolicy::Exact`] | 키 완전 일치 | 주 레코드 병합 identity |
//! | [`MatchPolicy::Containment`] | 완전 일치 또는 한쪽이 다른 쪽을 포함 | GMP 등 보조 신호 결합 |
//!
//! `Containment`는 오탐(false merge) 위험이 있으므로 주 레코드끼리의
//! 병합에는 절대 사용하지 않습니다.

/// 단독으로 제거하는 토큰 (법인 접미사, "ipo", 마케팅 문구).
const DROP_WORDS: &[&str] = &["ltd", "limited", "ipo", "live"];

/// 연속된 두 단어로 제거하는 마케팅 문구.
const DROP_PHRASES: &[(&str, &str)] = &[("closing", "today"), ("listing", "today")];

/// 표시용 이름을 비교 가능한 키로 변환합니다.
///
/// 1. 소문자 변환
/// 2. 첫 `&` 이후 절단
/// 3. 단어 단위로 `ltd`, `limited`, `ipo`, `live` 제거
/// 4. `closing today`, `listing today` 제거
/// 5. 남은 영숫자만 이어붙임
///
/// 단어 단위로 제거하므로 "Olive"의 `live`, "Hipolabs"의 `ipo`는 보존됩니다.
///
/// ```
/// use ipo_data::normalize::normalize;
///
/// assert_eq!(normalize("ABC Ltd"), "abc");
/// assert_eq!(normalize("ABC Limited IPO - Closing Today"), "abc");
/// assert_eq!(normalize("Tata & Sons Ltd"), "tata");
/// ```
pub fn normalize(name: &str) -> String {
    let lower = name.to_lowercase();
    let head = match lower.find('&') {
        Some(idx) => &lower[..idx],
        None => lower.as_str(),
    };

    // 영숫자가 아닌 문자를 구분자로 보고 단어 분리
    let spaced: String = head
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let words: Vec<&str> = spaced
        .split_whitespace()
        .filter(|w| !DROP_WORDS.contains(w))
        .collect();

    let mut key = String::with_capacity(head.len());
    let mut i = 0;
    while i < words.len() {
        if i + 1 < words.len() && DROP_PHRASES.contains(&(words[i], words[i + 1])) {
            i += 2;
            continue;
        }
        key.push_str(words[i]);
        i += 1;
    }

    key
}

/// 정규화 키 매칭 정책.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// 키 완전 일치. 레코드 병합 identity에 사용.
    Exact,
    /// 완전 일치 또는 포함 관계. 보조 신호 결합에만 사용.
    Containment,
}

impl MatchPolicy {
    /// 두 정규화 키가 같은 회사를 가리키는지 판단합니다.
    ///
    /// 빈 키는 어떤 키와도 일치하지 않습니다.
    pub fn matches(&self, a: &str, b: &str) -> bool {
        if a.is_empty() || b.is_empty() {
            return false;
        }

        match self {
            Self::Exact => a == b,
            Self::Containment => a == b || a.contains(b) || b.contains(a),
        }
    }
}

/// 두 표시용 이름이 같은 회사인지 판단합니다 (병합 identity).
pub fn same_entity(a: &str, b: &str) -> bool {
    MatchPolicy::Exact.matches(&normalize(a), &normalize(b))
}

/// 보조 신호(GMP 등)가 해당 회사에 속하는지 판단합니다.
pub fn signal_matches(a: &str, b: &str) -> bool {
    MatchPolicy::Containment.matches(&normalize(a), &normalize(b))
}
