// Talent Mining prompt templates.

pub const SIMILARITY_SYSTEM: &str = "\
You are a skills taxonomy expert. \
You judge how interchangeable two professional skills are for staffing purposes. \
You MUST respond with valid JSON only. No markdown fences or explanations.";

pub const SIMILARITY_PROMPT_TEMPLATE: &str = r#"For each REQUIRED skill, list the EXISTING skills that are the same or a close equivalent.

REQUIRED SKILLS:
{required}

EXISTING SKILLS:
{existing}

RULES:
- similarity is a number from 0.0 to 1.0; 1.0 means the same skill (synonyms, spelling variants).
- Only list pairs with similarity >= 0.5.
- existing_name must be copied exactly from EXISTING SKILLS.

OUTPUT SCHEMA (return exactly this structure):
[
  {"required_name": "string", "matches": [{"existing_name": "string", "similarity": 0.0}]}
]"#;

pub const JUSTIFICATION_SYSTEM: &str = "\
You are a recruiter writing for a hiring manager. \
Answer in plain text, two sentences at most, no lists, no markdown.";

pub const JUSTIFICATION_PROMPT_TEMPLATE: &str = r#"Explain briefly why this person fits the position.

REQUIRED SKILLS (name: required proficiency 1-5):
{required}

CANDIDATE: {full_name} (match score {score}/100)
MATCHED SKILLS (name: candidate proficiency, similarity):
{matched}"#;
