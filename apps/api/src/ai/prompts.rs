use crate::llm_client::prompts::JSON_ONLY_SYSTEM;

pub const PROJECT_DRAFT_SYSTEM: &str = JSON_ONLY_SYSTEM;

pub const PROJECT_DRAFT_TEMPLATE: &str = r#"You are an expert technical portfolio curator specializing in Data Engineering and Backend Development.
Analyze this GitHub repository content.
Base Repository URL: {repo_url} (use it to build absolute URLs for media when needed).

Repository content (may be truncated):
{context}

Return a JSON object with exactly this structure:

{
  "title": "Project name: professional and descriptive, not generic",
  "subtitle": "A catchy tagline, at most 60 characters",
  "category": "project",
  "tags": ["Tech1", "Tech2", "Tech3", "Tech4", "Tech5"],
  "urls": [
    {"type": "github", "url": "{repo_url}", "label": "Source Code"},
    {"type": "demo", "url": "URL found in the README, or null", "label": "Live Demo"}
  ],
  "media": {
    "gif_url": "Absolute URL of the first animated GIF found. Prefix relative paths with {raw_base}. null when none.",
    "image_url": "Absolute URL of the most representative image. Prefix relative paths with {raw_base}. null when none."
  },
  "translations": {
    "en": {
      "summary": "Two punchy sentences, at most 200 characters, on what the project does and why.",
      "description": "HTML. A Data Engineering narrative: the problem solved, the pipeline architecture, the impact. Use <h3> section headers such as 'The Challenge', 'The Solution', 'Key Features' and <ul>/<li> lists. Do not list the tech stack (that goes in tags). No markdown."
    },
    "es": {
      "summary": "Dos oraciones contundentes, máximo 200 caracteres, sobre qué hace el proyecto y por qué.",
      "description": "HTML. Una narrativa de Ingeniería de Datos: el problema resuelto, la arquitectura del pipeline, el impacto. Usa encabezados <h3> como 'El Desafío', 'La Solución', 'Características Clave' y listas <ul>/<li>. No listes el stack tecnológico (va en tags). Sin markdown."
    }
  },
  "diagram": "Mermaid code for a simple architecture or sequence diagram, starting with 'graph TD' or 'sequenceDiagram'."
}"#;

/// Fills [`PROJECT_DRAFT_TEMPLATE`]. The context is inserted last so
/// placeholder-like text inside a README is left alone.
pub fn project_draft_prompt(repo_url: &str, raw_base: &str, context: &str) -> String {
    PROJECT_DRAFT_TEMPLATE
        .replace("{repo_url}", repo_url)
        .replace("{raw_base}", raw_base)
        .replace("{context}", context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_fills_placeholders() {
        let prompt = project_draft_prompt(
            "https://github.com/a/b",
            "https://raw.githubusercontent.com/a/b/main/",
            "README says {repo_url}",
        );
        assert!(prompt.contains("\"url\": \"https://github.com/a/b\""));
        assert!(prompt.contains("Prefix relative paths with https://raw.githubusercontent.com/a/b/main/"));
        assert!(prompt.contains("README says {repo_url}"));
        assert!(!prompt.contains("{context}"));
    }
}
