#[derive(Clone, Copy, Debug)]
pub struct Glyphs {
    pub checked: &'static str,
    pub unchecked: &'static str,
    pub cursor: &'static str,
    pub edge: &'static str,
    pub h_separator: &'static str,
    pub ellipsis: &'static str,
}

pub fn select(fancy_requested: bool) -> Glyphs {
    if fancy_requested {
        fancy()
    } else {
        ascii()
    }
}

fn ascii() -> Glyphs {
    Glyphs {
        checked: "[x]",
        unchecked: "[ ]",
        cursor: ">",
        edge: "--",
        h_separator: "-",
        ellipsis: "~",
    }
}

fn fancy() -> Glyphs {
    Glyphs {
        checked: "☑",
        unchecked: "☐",
        cursor: "▶",
        edge: "──",
        h_separator: "─",
        ellipsis: "…",
    }
}
