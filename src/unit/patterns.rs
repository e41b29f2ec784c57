//! Static token tables and compiled expressions backing the unit parser.
//!
//! Everything here is immutable after first use. Lookups operate on text that
//! went through [`normalize_text`]: lowercased, diacritics folded, whitespace
//! collapsed.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::scale::{Magnitude, TimeScale};

// ================================================================================================
// Text normalization
// ================================================================================================

/// Lowercase, strip diacritics, collapse runs of whitespace.
pub(crate) fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.trim().chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        for lowered in c.to_lowercase() {
            out.push(fold_diacritic(lowered));
        }
    }
    out
}

/// Fold the Latin diacritics that show up in source labels ("Córdoba",
/// "Tögrög") onto their ASCII base letter. Non-Latin characters pass through.
fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'ā' | 'ă' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'ē' | 'ė' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'ī' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' | 'ō' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'ū' => 'u',
        'ý' | 'ÿ' => 'y',
        'ç' | 'č' | 'ć' => 'c',
        'ñ' | 'ń' => 'n',
        'š' | 'ş' | 'ș' => 's',
        'ž' | 'ź' | 'ż' => 'z',
        'ł' => 'l',
        'đ' => 'd',
        'ğ' => 'g',
        'ț' => 't',
        other => other,
    }
}

// ================================================================================================
// Currency registry
// ================================================================================================

/// ISO-4217 codes the engine accepts. Codes outside this list are treated as
/// ordinary words by the parser and rejected as explicit overrides.
pub(crate) const CURRENCY_CODES: &[&str] = &[
    "AED", "AFN", "ALL", "AMD", "ANG", "AOA", "ARS", "AUD", "AZN", "BAM", "BDT", "BGN", "BHD",
    "BIF", "BND", "BOB", "BRL", "BWP", "BYN", "CAD", "CDF", "CHF", "CLP", "CNY", "COP", "CRC",
    "CUP", "CVE", "CZK", "DJF", "DKK", "DOP", "DZD", "EGP", "ETB", "EUR", "FJD", "GBP", "GEL",
    "GHS", "GMD", "GNF", "GTQ", "GYD", "HKD", "HNL", "HTG", "HUF", "IDR", "ILS", "INR", "IQD",
    "IRR", "ISK", "JMD", "JOD", "JPY", "KES", "KGS", "KHR", "KMF", "KRW", "KWD", "KZT", "LAK",
    "LBP", "LKR", "LRD", "LSL", "LYD", "MAD", "MDL", "MGA", "MKD", "MMK", "MNT", "MOP", "MRU",
    "MUR", "MVR", "MWK", "MXN", "MYR", "MZN", "NAD", "NGN", "NIO", "NOK", "NPR", "NZD", "OMR",
    "PAB", "PEN", "PGK", "PHP", "PKR", "PLN", "PYG", "QAR", "RON", "RSD", "RUB", "RWF", "SAR",
    "SBD", "SCR", "SDG", "SEK", "SGD", "SLE", "SOS", "SRD", "SSP", "STN", "SYP", "SZL", "THB",
    "TJS", "TMT", "TND", "TOP", "TRY", "TTD", "TWD", "TZS", "UAH", "UGX", "USD", "UYU", "UZS",
    "VES", "VND", "VUV", "WST", "XAF", "XCD", "XOF", "XPF", "YER", "ZAR", "ZMW", "ZWL",
];

pub fn is_known_currency(code: &str) -> bool {
    code.len() == 3 && CURRENCY_CODES.iter().any(|c| c.eq_ignore_ascii_case(code))
}

/// Word-boundary scan for ISO codes. The boundaries matter: "scr" must not
/// fire inside "subscribers".
static CURRENCY_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = CURRENCY_CODES
        .iter()
        .map(|c| c.to_lowercase())
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b({alternation})\b")).expect("currency code pattern")
});

pub(crate) fn find_currency_code(text: &str) -> Option<String> {
    CURRENCY_CODE_RE
        .find(text)
        .map(|m| m.as_str().to_uppercase())
}

/// Symbol table in precedence order: multi-character symbols first so "R$"
/// does not collapse to "$", and the ambiguous "$"/"¥" resolve to USD/CNY.
const CURRENCY_SYMBOLS: &[(&str, &str)] = &[
    ("us$", "USD"),
    ("ca$", "CAD"),
    ("a$", "AUD"),
    ("nz$", "NZD"),
    ("hk$", "HKD"),
    ("mx$", "MXN"),
    ("r$", "BRL"),
    ("zł", "PLN"),
    ("kč", "CZK"),
    ("$", "USD"),
    ("€", "EUR"),
    ("£", "GBP"),
    ("¥", "CNY"),
    ("₩", "KRW"),
    ("₹", "INR"),
    ("₺", "TRY"),
    ("₽", "RUB"),
    ("₫", "VND"),
    ("₦", "NGN"),
    ("₱", "PHP"),
    ("฿", "THB"),
    ("₪", "ILS"),
    ("₴", "UAH"),
];

pub(crate) fn find_currency_symbol(text: &str) -> Option<&'static str> {
    CURRENCY_SYMBOLS
        .iter()
        .find(|(symbol, _)| text.contains(symbol))
        .map(|(_, code)| *code)
}

/// Last-resort currency words. Deliberately excludes "real" (collides with
/// "real GDP") and "dinar"/"peso" families with more than one plausible code.
const CURRENCY_WORDS: &[(&str, &str)] = &[
    ("dollars", "USD"),
    ("dollar", "USD"),
    ("euros", "EUR"),
    ("euro", "EUR"),
    ("yen", "JPY"),
    ("pounds sterling", "GBP"),
    ("pound sterling", "GBP"),
    ("sterling", "GBP"),
    ("pounds", "GBP"),
    ("pound", "GBP"),
    ("renminbi", "CNY"),
    ("yuan", "CNY"),
    ("rupees", "INR"),
    ("rupee", "INR"),
    ("rupiah", "IDR"),
    ("won", "KRW"),
    ("francs", "CHF"),
    ("franc", "CHF"),
    ("roubles", "RUB"),
    ("rouble", "RUB"),
    ("rubles", "RUB"),
    ("ruble", "RUB"),
    ("rand", "ZAR"),
    ("ringgit", "MYR"),
    ("baht", "THB"),
    ("zloty", "PLN"),
    ("lira", "TRY"),
    ("shekels", "ILS"),
    ("shekel", "ILS"),
    ("dirhams", "AED"),
    ("dirham", "AED"),
    ("riyals", "SAR"),
    ("riyal", "SAR"),
    ("naira", "NGN"),
    ("cedis", "GHS"),
    ("cedi", "GHS"),
    ("shillings", "KES"),
    ("shilling", "KES"),
];

static CURRENCY_WORD_RES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    CURRENCY_WORDS
        .iter()
        .map(|(word, code)| {
            (
                Regex::new(&format!(r"\b{word}\b")).expect("currency word pattern"),
                *code,
            )
        })
        .collect()
});

pub(crate) fn find_currency_word(text: &str) -> Option<&'static str> {
    CURRENCY_WORD_RES
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, code)| *code)
}

// ================================================================================================
// Magnitude and time tokens
// ================================================================================================

/// Longest token wins: "hundred million" must beat both "hundred" and
/// "million", "trillion" beats nothing but comes first for symmetry.
static MAGNITUDE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        \bhundred\ millions?\b
        | \btrillions?\b | \btn\b
        | \bbillions?\b  | \bbn\b
        | \bmillions?\b  | \bmn\b | \bmio\b | \bmm\b
        | \bthousands?\b | \bk\b  | '000s?  | \b000s?\b
        | \bhundreds?\b
        ",
    )
    .expect("magnitude pattern")
});

pub(crate) fn find_magnitude(text: &str) -> Option<Magnitude> {
    let token = MAGNITUDE_RE.find(text)?.as_str();
    let magnitude = if token.starts_with("hundred m") {
        Magnitude::HundredMillions
    } else if token.starts_with("trillion") || token == "tn" {
        Magnitude::Trillions
    } else if token.starts_with("billion") || token == "bn" {
        Magnitude::Billions
    } else if token.starts_with("million") || matches!(token, "mn" | "mio" | "mm") {
        Magnitude::Millions
    } else if token.starts_with("thousand") || token == "k" || token.contains("000") {
        Magnitude::Thousands
    } else {
        Magnitude::Hundreds
    };
    Some(magnitude)
}

static TIME_RES: Lazy<Vec<(Regex, TimeScale)>> = Lazy::new(|| {
    let table: &[(&str, TimeScale)] = &[
        (
            r"\bper\s+(year|annum|yr)\b|\byearly\b|\bannually\b|\bannuali[sz]ed\b|\bp\.a\.?|/yr\b|/year\b|/y\b",
            TimeScale::Year,
        ),
        (
            r"\bper\s+(quarter|qtr)\b|\bquarterly\b|/qtr\b|/quarter\b|/q\b",
            TimeScale::Quarter,
        ),
        (
            r"\bper\s+(month|mo|mth)\b|\bmonthly\b|/mth\b|/month\b|/mo\b",
            TimeScale::Month,
        ),
        (
            r"\bper\s+(week|wk)\b|\bweekly\b|/wk\b|/week\b",
            TimeScale::Week,
        ),
        (r"\bper\s+day\b|\bdaily\b|/day\b|/d\b", TimeScale::Day),
        (
            r"\bper\s+(hour|hr)\b|\bhourly\b|/hr\b|/hour\b|/h\b",
            TimeScale::Hour,
        ),
    ];
    table
        .iter()
        .map(|(pattern, scale)| (Regex::new(pattern).expect("time pattern"), *scale))
        .collect()
});

pub(crate) fn find_time_scale(text: &str) -> Option<TimeScale> {
    TIME_RES
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, scale)| *scale)
}

/// Words that denote a time basis when they follow a slash; used to keep the
/// price pattern ("USD/litre") from swallowing composites ("USD/Month").
pub(crate) fn is_time_word(word: &str) -> bool {
    matches!(
        word,
        "year" | "yr" | "annum" | "quarter" | "qtr" | "q" | "month" | "mth" | "mo" | "week"
            | "wk" | "day" | "d" | "hour" | "hr" | "h"
    )
}

// ================================================================================================
// Category tokens
// ================================================================================================

pub(crate) static PERCENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"%|\bpct\b|\bpercent(age)?\b|\bpp\b|\bbps\b").expect("percent pattern")
});

pub(crate) static INDEX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bbasis points\b|\bindex\b|\bpoints?\b").expect("index pattern"));

pub(crate) static RATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bper\s+(capita|person|head|1,?000|100,?000|million)\b|/100\b")
        .expect("rate pattern")
});

/// Price quotation: ISO code, slash, denominator word ("USD/litre").
/// The caller must check the code is registered and the word is not a time
/// token before treating the match as a rate.
pub(crate) static PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([a-z]{3})/([a-z0-9]+)\b").expect("price pattern"));

/// A bare duration: the whole unit is a time word ("Days", "years").
pub(crate) static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(hours?|days?|weeks?|months?|quarters?|years?)$").expect("duration pattern")
});

pub(crate) static RATIO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\btimes\b|\bratio\b|\bmultiples?\b|\bcoefficient\b|\bx\b|\b\d+(\.\d+)?x\b")
        .expect("ratio pattern")
});

// ================================================================================================
// Domain dictionaries
// ================================================================================================

fn dictionary(table: &[(&'static str, &'static str)]) -> Vec<(Regex, &'static str)> {
    table
        .iter()
        .map(|(pattern, label)| {
            (
                Regex::new(&format!(r"\b(?:{pattern})\b")).expect("dictionary pattern"),
                *label,
            )
        })
        .collect()
}

fn lookup(dict: &[(Regex, &'static str)], text: &str) -> Option<&'static str> {
    dict.iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, label)| *label)
}

static ENERGY_DICT: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    dictionary(&[
        ("mmbtu", "MMBtu"),
        ("btu", "BTU"),
        ("terawatt hours?|twh", "TWh"),
        ("gigawatt hours?|gwh", "GWh"),
        ("megawatt hours?|mwh", "MWh"),
        ("kilowatt hours?|kwh", "kWh"),
        ("terajoules?|tj", "TJ"),
        ("gigajoules?|gj", "GJ"),
        ("petajoules?|pj", "PJ"),
        ("gigawatts?|gw", "GW"),
        ("megawatts?|mw", "MW"),
        ("kilowatts?|kw", "kW"),
        ("barrels? of oil equivalent|boe", "boe"),
        ("tonnes? of oil equivalent|toe", "toe"),
    ])
});

// Hand-built: "°" is not a word character, so a \b-wrapped dictionary entry
// would never match the symbol forms.
static TEMPERATURE_DICT: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"°\s?c\b|\bdegrees? celsius\b|\bcelsius\b", "°C"),
        (r"°\s?f\b|\bdegrees? fahrenheit\b|\bfahrenheit\b", "°F"),
        (r"\bkelvin\b", "kelvin"),
    ]
    .iter()
    .map(|(pattern, label)| {
        (
            Regex::new(pattern).expect("temperature pattern"),
            *label,
        )
    })
    .collect()
});

static PHYSICAL_DICT: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    dictionary(&[
        ("metric tonnes?|metric tons?|tonnes?|mt", "tonnes"),
        ("tons?", "tonnes"),
        ("kilograms?|kg", "kg"),
        ("grams?|g", "g"),
        ("hectolitres?|hectoliters?|hl", "hl"),
        ("litres?|liters?", "litres"),
        ("barrels?|bbl", "BBL"),
        ("bushels?", "bushels"),
        ("hectares?|ha", "hectares"),
        ("cubic met(?:er|re)s?|m3", "m3"),
        ("square met(?:er|re)s?|sqm|m2", "m2"),
        ("kilomet(?:er|re)s?|km", "km"),
        ("troy ounces?|ounces?|oz", "oz"),
        ("carats?", "carats"),
    ])
});

static POPULATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bpersons?\b|\bpeople\b|\binhabitants?\b|\bresidents?\b|\bpopulation\b")
        .expect("population pattern")
});

static COUNT_DICT: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    dictionary(&[
        ("units?", "units"),
        ("numbers?", "units"),
        ("pieces?", "units"),
        ("vehicles?", "vehicles"),
        ("cars?", "vehicles"),
        ("dwellings?", "dwellings"),
        ("permits?", "permits"),
        ("subscribers?", "subscribers"),
        ("subscriptions?", "subscriptions"),
        ("passengers?", "passengers"),
        ("arrivals?", "arrivals"),
        ("visitors?", "visitors"),
        ("registrations?", "registrations"),
        ("transactions?", "transactions"),
        ("households?", "households"),
        ("companies|firms?", "companies"),
        ("jobs?", "jobs"),
    ])
});

static METALS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\bcopper\b|\bsilver\b|\bgold\b|\bsteel\b|\balumini?um\b|\bzinc\b|\bnickel\b|\biron ore\b|\bplatinum\b|\bpalladium\b|\btin\b|\blead\b",
    )
    .expect("metals pattern")
});

static COMMODITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bbbl\b|\bbarrels?\b|\bcrude\b|\boil\b|\bnatural gas\b|\bgas\b|\bcoal\b|\btroy ounces?\b")
        .expect("commodity pattern")
});

static AGRICULTURE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\bbushels?\b|\bwheat\b|\bmaize\b|\bcorn\b|\bsoy(?:bean)?s?\b|\bcocoa\b|\bcoffee\b|\bsugar\b|\bcotton\b|\blivestock\b|\bcattle\b|\bcrops?\b|\bgrain\b|\bharvests?\b",
    )
    .expect("agriculture pattern")
});

static EMISSIONS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bco2e?\b|\bmtco2e?\b|\bktco2e?\b|\bcarbon\b|\bemissions?\b|\bghg\b")
        .expect("emissions pattern")
});

static WAGES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bwages?\b|\bsalar(?:y|ies)\b|\bearnings\b|\bcompensation\b|\bpayroll\b")
        .expect("wages pattern")
});

static MONETARY_AGGREGATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bmoney supply\b|\bm[0-3]\b|\bmonetary base\b|\bbroad money\b|\bnarrow money\b")
        .expect("monetary aggregate pattern")
});

pub(crate) fn energy_label(text: &str) -> Option<&'static str> {
    lookup(&ENERGY_DICT, text)
}

pub(crate) fn temperature_label(text: &str) -> Option<&'static str> {
    lookup(&TEMPERATURE_DICT, text)
}

pub(crate) fn physical_label(text: &str) -> Option<&'static str> {
    lookup(&PHYSICAL_DICT, text)
}

pub(crate) fn count_label(text: &str) -> Option<&'static str> {
    lookup(&COUNT_DICT, text)
}

pub(crate) fn is_population(text: &str) -> bool {
    POPULATION_RE.is_match(text)
}

pub(crate) fn is_metals(text: &str) -> bool {
    METALS_RE.is_match(text)
}

pub(crate) fn is_commodity(text: &str) -> bool {
    COMMODITY_RE.is_match(text)
}

pub(crate) fn is_agriculture(text: &str) -> bool {
    AGRICULTURE_RE.is_match(text)
}

pub(crate) fn is_emissions(text: &str) -> bool {
    EMISSIONS_RE.is_match(text)
}

pub(crate) fn is_wages(text: &str) -> bool {
    WAGES_RE.is_match(text)
}

pub(crate) fn is_monetary_aggregate(text: &str) -> bool {
    MONETARY_AGGREGATE_RE.is_match(text)
}
