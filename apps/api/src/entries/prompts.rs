pub const ENTRY_ANALYSIS_PROMPT: &str = "\
    You read one short diary entry. In two or three sentences, describe what \
    the user was doing and how they seemed to feel. Reply with the description \
    only.";
