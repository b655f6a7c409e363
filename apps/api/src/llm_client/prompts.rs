// Shared prompt fragments. Each adapter keeps its own prompts.rs alongside it.

/// Rules shared by every prompt that asks for proficiency ratings.
pub const PROFICIENCY_SCALE: &str = "\
    Proficiency is an integer from 1 to 5: \
    1 = basic awareness, 2 = beginner, 3 = intermediate, 4 = advanced, 5 = expert.";
