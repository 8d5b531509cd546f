//! Prompt compiler for collage generation.
//!
//! [`compile_prompt`] turns a style label, the ordered product list, and the
//! optional [`PresentationOptions`] into the single instruction string sent
//! to the image generator. It is a pure function: identical input always
//! yields an identical prompt.
//!
//! Product names and brands are embedded exactly as given. The generator is
//! asked to reproduce them as on-image labels, so any normalisation here
//! would show up as a misspelt label.

use crate::options::PresentationOptions;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Output width in pixels.
pub const OUTPUT_WIDTH_PX: u32 = 1080;

/// Output height in pixels.
pub const OUTPUT_HEIGHT_PX: u32 = 1080;

/// Styles offered by the submission form. The style label itself is free text.
pub const STYLE_PRESETS: &[&str] = &[
    "Creative & cute with handwritten notes",
    "Minimalist and clean",
    "Vintage magazine style",
    "Modern editorial layout",
];

/// Restriction sentence present in every prompt.
pub const ONLY_LISTED_ITEMS_CLAUSE: &str = "Use ONLY the items listed above and the uploaded \
reference photo. Do NOT invent, add, or suggest any other garments, shoes, bags, accessories, \
or products that are not on this list.";

/// Emitted instead of the label instructions when labels are switched off.
pub const NO_LABELS_CLAUSE: &str = "Do NOT add any text labels, captions, brand names, or \
product names to the image. The collage must contain no text at all.";

// ---------------------------------------------------------------------------
// Phrase tables
// ---------------------------------------------------------------------------

/// Immutable mapping from an option value to its descriptive phrase.
#[derive(Debug)]
pub struct PhraseTable {
    /// Option field name, matching the [`PresentationOptions`] field.
    pub field: &'static str,
    /// Heading used when the clause is rendered.
    pub heading: &'static str,
    pub entries: &'static [(&'static str, &'static str)],
}

impl PhraseTable {
    /// Look up the phrase for `value`, falling back to the raw value itself.
    pub fn describe<'a>(&'static self, value: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|(key, _)| *key == value)
            .map(|(_, phrase)| *phrase)
            .unwrap_or(value)
    }

    /// Known option values, in table order.
    pub fn values(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(key, _)| *key)
    }

    fn clause(&'static self, value: &str) -> String {
        format!("{}: {}.", self.heading, self.describe(value))
    }
}

pub static COLOR_PALETTE: PhraseTable = PhraseTable {
    field: "color_palette",
    heading: "Color palette",
    entries: &[
        ("vibrant", "vibrant, bold, saturated colors"),
        ("pastel", "soft, muted pastel colors"),
        ("monochrome", "a monochrome palette built from shades of a single color"),
        ("earth", "warm earth tones such as terracotta, olive, sand, and brown"),
        ("neon", "bright neon colors with high contrast"),
        ("bw", "a strictly black and white palette"),
    ],
};

pub static MOOD: PhraseTable = PhraseTable {
    field: "mood",
    heading: "Mood",
    entries: &[
        ("playful", "a playful, fun, lighthearted feel"),
        ("elegant", "an elegant, refined, sophisticated feel"),
        ("edgy", "an edgy, bold, urban feel"),
        ("minimalist", "a clean, minimal, understated feel"),
        ("maximalist", "a rich, layered, maximalist feel"),
    ],
};

pub static TYPOGRAPHY: PhraseTable = PhraseTable {
    field: "typography",
    heading: "Typography",
    entries: &[
        ("handwritten", "casual handwritten lettering"),
        ("modern", "clean modern sans-serif type"),
        ("script", "elegant flowing script lettering"),
        ("vintage", "vintage typewriter-style type"),
        ("bold", "bold block capitals"),
    ],
};

pub static LABEL_PLACEMENT: PhraseTable = PhraseTable {
    field: "label_placement",
    heading: "Label placement",
    entries: &[
        ("overlay", "place each label directly over its item"),
        ("side", "place each label beside its item"),
        ("bottom", "gather all labels along the bottom of the collage"),
        ("scattered", "scatter the labels playfully around the items"),
    ],
};

pub static LAYOUT: PhraseTable = PhraseTable {
    field: "layout",
    heading: "Layout",
    entries: &[
        ("grid", "a clean, evenly aligned grid"),
        ("collage", "a natural, overlapping scrapbook-style collage"),
        ("centered", "one central focal item with the others arranged around it"),
        ("asymmetric", "a dynamic asymmetric composition"),
        ("magazine", "an editorial magazine-spread layout"),
    ],
};

pub static SPACING: PhraseTable = PhraseTable {
    field: "spacing",
    heading: "Spacing",
    entries: &[
        ("tight", "tight, dense spacing with items close together"),
        ("balanced", "balanced, even spacing between items"),
        ("spacious", "generous, airy spacing with plenty of negative space"),
    ],
};

pub static BACKGROUND: PhraseTable = PhraseTable {
    field: "background",
    heading: "Background",
    entries: &[
        ("white", "a clean plain white background"),
        ("paper", "a textured paper background"),
        ("gradient", "a soft color gradient background"),
        ("pattern", "a subtle patterned background"),
        ("photo", "a softly blurred lifestyle photo background"),
    ],
};

pub static BORDER_STYLE: PhraseTable = PhraseTable {
    field: "border_style",
    heading: "Borders",
    entries: &[
        ("torn", "torn-paper edges around each cutout"),
        ("polaroid", "polaroid-style photo frames around each item"),
        ("rounded", "rounded corners on every image"),
    ],
};

/// Every phrase table, in the order their clauses are rendered.
pub static ALL_TABLES: &[&PhraseTable] = &[
    &COLOR_PALETTE,
    &MOOD,
    &TYPOGRAPHY,
    &LABEL_PLACEMENT,
    &LAYOUT,
    &SPACING,
    &BACKGROUND,
    &BORDER_STYLE,
];

const TEXTURE_CLAUSE: &str =
    "Texture: add a subtle tactile texture, like paper grain or fabric weave, to the background.";

const DECORATIVE_CLAUSE: &str = "Decorative elements: add small decorative accents such as \
stickers, doodles, stars, and washi tape strips, without adding any new products.";

// ---------------------------------------------------------------------------
// Compiler
// ---------------------------------------------------------------------------

/// One product as seen by the compiler.
#[derive(Debug, Clone, Copy)]
pub struct PromptProduct<'a> {
    pub name: &'a str,
    pub brand: &'a str,
    pub url: Option<&'a str>,
}

/// Render the generator instruction for a collage.
///
/// Sections, separated by blank lines:
/// 1. intro naming the style and enumerating the items
/// 2. the restriction clause ([`ONLY_LISTED_ITEMS_CLAUSE`])
/// 3. exact-spelling label instructions, or [`NO_LABELS_CLAUSE`]
/// 4. one clause per populated option (label styling only when labels show)
/// 5. the closing requirements block
pub fn compile_prompt(
    style: &str,
    products: &[PromptProduct<'_>],
    options: Option<&PresentationOptions>,
) -> String {
    let labels_shown = options.map_or(true, PresentationOptions::labels_shown);

    let mut sections = vec![intro(style, products), restriction(products.len())];

    if labels_shown {
        sections.push(label_instructions(products));
    } else {
        sections.push(NO_LABELS_CLAUSE.to_string());
    }

    if let Some(opts) = options {
        let clauses = option_clauses(opts, labels_shown);
        if !clauses.is_empty() {
            sections.push(clauses.join("\n"));
        }
    }

    sections.push(closing(style));
    sections.join("\n\n")
}

fn intro(style: &str, products: &[PromptProduct<'_>]) -> String {
    let listing = products
        .iter()
        .map(|p| match p.url {
            Some(url) => format!("\"{}\" by \"{}\" ({url})", p.name, p.brand),
            None => format!("\"{}\" by \"{}\"", p.name, p.brand),
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Create a fashion mood board collage in {style} style, based on the uploaded outfit \
         photo. The collage should feature cutouts and illustrations of these fashion items: \
         {listing}."
    )
}

fn restriction(count: usize) -> String {
    let noun = if count == 1 { "item" } else { "items" };
    format!("STRICT CONTENT RULE ({count} {noun} in total): {ONLY_LISTED_ITEMS_CLAUSE}")
}

fn label_instructions(products: &[PromptProduct<'_>]) -> String {
    let lines = products
        .iter()
        .map(|p| {
            format!(
                "- Product: \"{}\" (spell exactly as shown)\n- Brand: \"{}\" (spell exactly as shown)",
                p.name, p.brand
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "IMPORTANT: When adding text labels to the collage, you must use these EXACT spellings \
         for brand and product names (do not change, correct, or modify the spelling in any \
         way):\n{lines}"
    )
}

fn option_clauses(opts: &PresentationOptions, labels_shown: bool) -> Vec<String> {
    let mut clauses = Vec::new();

    let mut push = |table: &'static PhraseTable, value: &Option<String>| {
        if let Some(v) = value {
            clauses.push(table.clause(v));
        }
    };

    push(&COLOR_PALETTE, &opts.color_palette);
    push(&MOOD, &opts.mood);
    if labels_shown {
        push(&TYPOGRAPHY, &opts.typography);
        push(&LABEL_PLACEMENT, &opts.label_placement);
    }
    push(&LAYOUT, &opts.layout);
    push(&SPACING, &opts.spacing);
    push(&BACKGROUND, &opts.background);
    push(&BORDER_STYLE, &opts.border_style);

    if opts.texture == Some(true) {
        clauses.push(TEXTURE_CLAUSE.to_string());
    }
    if opts.decorative_elements == Some(true) {
        clauses.push(DECORATIVE_CLAUSE.to_string());
    }

    clauses
}

fn closing(style: &str) -> String {
    format!(
        "FINAL REQUIREMENTS: Any brand or product name that appears in the image must be spelled \
         exactly as provided above, with no corrections. Show only the listed items from the \
         reference photo and nothing else. The overall aesthetic should be {style}, like a \
         professional fashion mood board. The output must be a square image of \
         {OUTPUT_WIDTH_PX}x{OUTPUT_HEIGHT_PX} pixels, ready for social media sharing."
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
