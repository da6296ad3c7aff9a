use std::fmt;

const CITY_PREFIXES: [&str; 2] = ["thanh pho ", "tinh "];

/// normalize_city
///
/// Canonical key for matching a user's city against map regions: lowercase, Vietnamese
/// diacritics removed (`đ` becomes `d`), administrative prefixes dropped, trimmed.
pub fn normalize_city(city: &str) -> String {
    let folded: String = city
        .to_lowercase()
        .chars()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .map(fold_vietnamese)
        .collect();
    let mut normalized = folded.as_str();
    for prefix in CITY_PREFIXES {
        normalized = normalized.trim_start();
        if let Some(rest) = normalized.strip_prefix(prefix) {
            normalized = rest;
        }
    }
    normalized.trim().to_string()
}

fn fold_vietnamese(c: char) -> char {
    match c {
        'à' | 'á' | 'ả' | 'ã' | 'ạ' | 'ă' | 'ằ' | 'ắ' | 'ẳ' | 'ẵ' | 'ặ' | 'â' | 'ầ' | 'ấ' | 'ẩ'
        | 'ẫ' | 'ậ' => 'a',
        'è' | 'é' | 'ẻ' | 'ẽ' | 'ẹ' | 'ê' | 'ề' | 'ế' | 'ể' | 'ễ' | 'ệ' => 'e',
        'ì' | 'í' | 'ỉ' | 'ĩ' | 'ị' => 'i',
        'ò' | 'ó' | 'ỏ' | 'õ' | 'ọ' | 'ô' | 'ồ' | 'ố' | 'ổ' | 'ỗ' | 'ộ' | 'ơ' | 'ờ' | 'ớ' | 'ở'
        | 'ỡ' | 'ợ' => 'o',
        'ù' | 'ú' | 'ủ' | 'ũ' | 'ụ' | 'ư' | 'ừ' | 'ứ' | 'ử' | 'ữ' | 'ự' => 'u',
        'ỳ' | 'ý' | 'ỷ' | 'ỹ' | 'ỵ' => 'y',
        'đ' => 'd',
        other => other,
    }
}

/// DensityLevel
///
/// Bucket of a region's user count relative to the busiest region, used to colour the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DensityLevel {
    None,
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl DensityLevel {
    pub fn classify(users: u64, max: u64) -> Self {
        if users == 0 || max == 0 {
            return DensityLevel::None;
        }
        let ratio = users as f64 / max as f64;
        if ratio > 0.7 {
            DensityLevel::VeryHigh
        } else if ratio > 0.5 {
            DensityLevel::High
        } else if ratio > 0.3 {
            DensityLevel::Medium
        } else if ratio > 0.1 {
            DensityLevel::Low
        } else {
            DensityLevel::VeryLow
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            DensityLevel::None => "#e5e7eb",
            DensityLevel::VeryLow => "#60a5fa",
            DensityLevel::Low => "#34d399",
            DensityLevel::Medium => "#fbbf24",
            DensityLevel::High => "#f97316",
            DensityLevel::VeryHigh => "#dc2626",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DensityLevel::None => "No data",
            DensityLevel::VeryLow => "Very low",
            DensityLevel::Low => "Low",
            DensityLevel::Medium => "Medium",
            DensityLevel::High => "High",
            DensityLevel::VeryHigh => "Very high",
        }
    }
}

impl fmt::Display for DensityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
