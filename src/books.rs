//! Canonical book table.
//!
//! Maps OSIS book ids, USX book codes and English names onto one entry so
//! references in any of the supported notations resolve to the same book.
//! The versification table uses abbreviations that coincide with the USX
//! codes apart from letter case, so lookups are case-insensitive.

use crate::model::BookMeta;

/// One entry of the canonical book table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookInfo {
    pub osis_id: &'static str,
    pub usx_code: &'static str,
    pub number: u32,
    pub name: &'static str,
}

impl BookInfo {
    /// Metadata for this book as a caller would supply it.
    pub fn to_meta(&self) -> BookMeta {
        BookMeta::new(self.osis_id, self.number, self.name, self.osis_id)
    }
}

macro_rules! books {
    ($(($osis:literal, $usx:literal, $num:literal, $name:literal)),* $(,)?) => {
        &[$(BookInfo { osis_id: $osis, usx_code: $usx, number: $num, name: $name }),*]
    };
}

pub const BOOKS: &[BookInfo] = books![
    ("Gen", "GEN", 1, "Genesis"),
    ("Exod", "EXO", 2, "Exodus"),
    ("Lev", "LEV", 3, "Leviticus"),
    ("Num", "NUM", 4, "Numbers"),
    ("Deut", "DEU", 5, "Deuteronomy"),
    ("Josh", "JOS", 6, "Joshua"),
    ("Judg", "JDG", 7, "Judges"),
    ("Ruth", "RUT", 8, "Ruth"),
    ("1Sam", "1SA", 9, "1 Samuel"),
    ("2Sam", "2SA", 10, "2 Samuel"),
    ("1Kgs", "1KI", 11, "1 Kings"),
    ("2Kgs", "2KI", 12, "2 Kings"),
    ("1Chr", "1CH", 13, "1 Chronicles"),
    ("2Chr", "2CH", 14, "2 Chronicles"),
    ("Ezra", "EZR", 15, "Ezra"),
    ("Neh", "NEH", 16, "Nehemiah"),
    ("Esth", "EST", 17, "Esther"),
    ("Job", "JOB", 18, "Job"),
    ("Ps", "PSA", 19, "Psalms"),
    ("Prov", "PRO", 20, "Proverbs"),
    ("Eccl", "ECC", 21, "Ecclesiastes"),
    ("Song", "SNG", 22, "Song of Songs"),
    ("Isa", "ISA", 23, "Isaiah"),
    ("Jer", "JER", 24, "Jeremiah"),
    ("Lam", "LAM", 25, "Lamentations"),
    ("Ezek", "EZK", 26, "Ezekiel"),
    ("Dan", "DAN", 27, "Daniel"),
    ("Hos", "HOS", 28, "Hosea"),
    ("Joel", "JOL", 29, "Joel"),
    ("Amos", "AMO", 30, "Amos"),
    ("Obad", "OBA", 31, "Obadiah"),
    ("Jonah", "JON", 32, "Jonah"),
    ("Mic", "MIC", 33, "Micah"),
    ("Nah", "NAM", 34, "Nahum"),
    ("Hab", "HAB", 35, "Habakkuk"),
    ("Zeph", "ZEP", 36, "Zephaniah"),
    ("Hag", "HAG", 37, "Haggai"),
    ("Zech", "ZEC", 38, "Zechariah"),
    ("Mal", "MAL", 39, "Malachi"),
    ("Matt", "MAT", 40, "Matthew"),
    ("Mark", "MRK", 41, "Mark"),
    ("Luke", "LUK", 42, "Luke"),
    ("John", "JHN", 43, "John"),
    ("Acts", "ACT", 44, "Acts"),
    ("Rom", "ROM", 45, "Romans"),
    ("1Cor", "1CO", 46, "1 Corinthians"),
    ("2Cor", "2CO", 47, "2 Corinthians"),
    ("Gal", "GAL", 48, "Galatians"),
    ("Eph", "EPH", 49, "Ephesians"),
    ("Phil", "PHP", 50, "Philippians"),
    ("Col", "COL", 51, "Colossians"),
    ("1Thess", "1TH", 52, "1 Thessalonians"),
    ("2Thess", "2TH", 53, "2 Thessalonians"),
    ("1Tim", "1TI", 54, "1 Timothy"),
    ("2Tim", "2TI", 55, "2 Timothy"),
    ("Titus", "TIT", 56, "Titus"),
    ("Phlm", "PHM", 57, "Philemon"),
    ("Heb", "HEB", 58, "Hebrews"),
    ("Jas", "JAS", 59, "James"),
    ("1Pet", "1PE", 60, "1 Peter"),
    ("2Pet", "2PE", 61, "2 Peter"),
    ("1John", "1JN", 62, "1 John"),
    ("2John", "2JN", 63, "2 John"),
    ("3John", "3JN", 64, "3 John"),
    ("Jude", "JUD", 65, "Jude"),
    ("Rev", "REV", 66, "Revelation"),
    ("Tob", "TOB", 67, "Tobit"),
    ("Jdt", "JDT", 68, "Judith"),
    ("Wis", "WIS", 69, "Wisdom of Solomon"),
    ("Sir", "SIR", 70, "Sirach"),
    ("Bar", "BAR", 71, "Baruch"),
    ("1Macc", "1MA", 72, "1 Maccabees"),
    ("2Macc", "2MA", 73, "2 Maccabees"),
];

/// Look up a book by OSIS id, USX code or English name (case-insensitive).
pub fn find_book(id: &str) -> Option<&'static BookInfo> {
    let id = id.trim();
    BOOKS.iter().find(|b| {
        b.osis_id.eq_ignore_ascii_case(id)
            || b.usx_code.eq_ignore_ascii_case(id)
            || b.name.eq_ignore_ascii_case(id)
    })
}

/// Look up a book by its exact OSIS id.
pub fn book_by_osis_id(osis_id: &str) -> Option<&'static BookInfo> {
    BOOKS.iter().find(|b| b.osis_id == osis_id)
}

/// Look up a book by its USX code (case-insensitive).
pub fn book_by_usx_code(code: &str) -> Option<&'static BookInfo> {
    BOOKS.iter().find(|b| b.usx_code.eq_ignore_ascii_case(code.trim()))
}

/// Metadata for every book in the table, in canonical order.
pub fn standard_book_meta() -> Vec<BookMeta> {
    BOOKS.iter().map(BookInfo::to_meta).collect()
}
