// Skill extraction prompt templates.

pub const EXTRACTION_SYSTEM: &str = "\
You are an HR skills analyst. \
You read collaborator records and list the concrete professional skills they demonstrate. \
You MUST respond with valid JSON only. No markdown fences or explanations. \
Never invent skills that the record does not support.";

pub const EXTRACTION_PROMPT_TEMPLATE: &str = r#"Extract the professional skills of each collaborator below.

COLLABORATORS (JSON):
{collaborators}

RULES:
- Return at most 15 skills per collaborator.
- {proficiency_scale}
- Stay inside each collaborator's "suggested_proficiency" range unless the record clearly says otherwise.
- "origin" is where the skill was found: "responsibilities" | "certifications" | "education" | "experience" | "position" | "inferred".
- Use short canonical skill names ("PostgreSQL", not "worked with postgres databases").

OUTPUT SCHEMA (return exactly this structure, keyed by user_name):
{
  "<user_name>": [
    {"name": "string", "proficiency": 1-5, "origin": "string"}
  ]
}"#;
