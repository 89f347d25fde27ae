//! Disposal instructions for each trash class the classifier can predict.

/// Returned for labels that have no catalog entry.
pub const FALLBACK_INSTRUCTIONS: &str = "Check local guidance.";

static CATALOG: &[(&str, &str)] = &[
    (
        "cardboard",
        "Flatten all cardboard boxes to save space and keep them dry to maintain recyclability. \
         Remove any plastic tape, labels, or packing materials if possible. \
         Place in your curbside recycling bin or take to a designated recycling drop-off center.",
    ),
    (
        "glass",
        "Rinse glass bottles and jars thoroughly to remove food or liquid residue. \
         Separate by color if required by your local recycling program. \
         Avoid breaking the glass, and never include ceramics, lightbulbs, or tempered glass. \
         Place in glass recycling or mixed recyclables as per your municipality\u{2019}s rules.",
    ),
    (
        "metal",
        "Empty and rinse all metal cans, tins, or containers. \
         Crush cans to save space if allowed. \
         Remove paper labels if possible, but it\u{2019}s not always required. \
         Place clean metal items into your recycling bin or take them to a scrap metal collection point.",
    ),
    (
        "paper",
        "Recycle clean, dry paper such as newspapers, magazines, printer paper, and envelopes. \
         Avoid recycling paper contaminated with grease, food, or heavy coatings. \
         Stack or bundle large sheets for easier processing. \
         Place in your curbside recycling bin or a designated paper recycling container.",
    ),
    (
        "plastic",
        "Rinse all plastic containers to remove food or liquid residue. \
         Check the recycling code (#1 through #7) and confirm with your local recycling guidelines \
         which types are accepted. Remove caps and lids unless instructed otherwise. \
         Flatten bottles to save space before placing them in the recycling bin.",
    ),
    (
        "trash",
        "Place non-recyclable items in the general waste bin for landfill disposal. \
         Avoid mixing hazardous materials, electronics, or batteries with household trash. \
         Check if any items can be repurposed or disposed of through special waste programs \
         before discarding.",
    ),
];

/// Instructions for `label`, or [`FALLBACK_INSTRUCTIONS`] when the label is unknown.
pub fn instructions_for(label: &str) -> &'static str {
    CATALOG
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, text)| *text)
        .unwrap_or(FALLBACK_INSTRUCTIONS)
}

/// Class names that have catalog entries
pub fn known_labels() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|(name, _)| *name)
}
