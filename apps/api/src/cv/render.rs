//! Printable HTML rendering of a [`Resume`]. The same document feeds the
//! `/cv` page and the PDF renderer.

use std::fmt::Write;

use super::builder::Resume;

const STYLE: &str = "\
body{font-family:'Helvetica Neue',Arial,sans-serif;color:#222;max-width:820px;margin:0 auto;padding:32px;font-size:11pt;line-height:1.45}\
h1{margin:0;font-size:24pt}h2{border-bottom:2px solid #2b6cb0;color:#2b6cb0;font-size:13pt;margin-top:22px;padding-bottom:2px;text-transform:uppercase}\
.label{color:#555;font-size:13pt;margin:2px 0 8px}.contact{color:#444;font-size:10pt}.contact a{color:#2b6cb0;text-decoration:none}\
.entry{margin-bottom:12px}.entry-head{display:flex;justify-content:space-between;font-weight:bold}.dates{color:#666;font-weight:normal;white-space:nowrap}\
.sub{color:#555;font-style:italic}ul{margin:4px 0 0 18px;padding:0}.skills dt{font-weight:bold}.skills dd{margin:0 0 6px 0}\
@page{size:A4;margin:14mm}";

struct Headings {
    summary: &'static str,
    experience: &'static str,
    education: &'static str,
    skills: &'static str,
    certifications: &'static str,
    projects: &'static str,
    languages: &'static str,
    courses: &'static str,
}

fn headings(lang: &str) -> Headings {
    if lang == "es" {
        Headings {
            summary: "Perfil",
            experience: "Experiencia",
            education: "Educación",
            skills: "Habilidades",
            certifications: "Certificaciones",
            projects: "Proyectos",
            languages: "Idiomas",
            courses: "Cursos",
        }
    } else {
        Headings {
            summary: "Profile",
            experience: "Experience",
            education: "Education",
            skills: "Skills",
            certifications: "Certifications",
            projects: "Projects",
            languages: "Languages",
            courses: "Courses",
        }
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn date_range(start: &str, end: &str) -> String {
    match (start.is_empty(), end.is_empty()) {
        (false, false) => format!("{} – {}", escape_html(start), escape_html(end)),
        (false, true) => escape_html(start),
        (true, false) => escape_html(end),
        (true, true) => String::new(),
    }
}

/// Only http(s) and mailto links are rendered as anchors.
fn safe_href(url: &str) -> Option<String> {
    let url = url.trim();
    let lower = url.to_ascii_lowercase();
    (lower.starts_with("https://") || lower.starts_with("http://") || lower.starts_with("mailto:"))
        .then(|| escape_html(url))
}

fn bullet_list(out: &mut String, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str("<ul>");
    for item in items {
        let _ = write!(out, "<li>{}</li>", escape_html(item));
    }
    out.push_str("</ul>");
}

fn entry_head(out: &mut String, title: &str, dates: &str) {
    let _ = write!(
        out,
        "<div class=\"entry-head\"><span>{}</span><span class=\"dates\">{dates}</span></div>",
        escape_html(title)
    );
}

pub fn render_html(resume: &Resume, lang: &str) -> String {
    let h = headings(lang);
    let basics = &resume.basics;
    let mut out = String::with_capacity(8 * 1024);

    let _ = write!(
        out,
        "<!DOCTYPE html><html lang=\"{}\"><head><meta charset=\"utf-8\"><title>{}</title><style>{STYLE}</style></head><body>",
        escape_html(lang),
        escape_html(&basics.name)
    );

    let _ = write!(out, "<header><h1>{}</h1>", escape_html(&basics.name));
    if !basics.label.is_empty() {
        let _ = write!(out, "<p class=\"label\">{}</p>", escape_html(&basics.label));
    }
    let mut contact = Vec::new();
    if !basics.email.is_empty() {
        contact.push(escape_html(&basics.email));
    }
    if !basics.phone.is_empty() {
        contact.push(escape_html(&basics.phone));
    }
    let place: Vec<&str> = [basics.location.city.as_str(), basics.location.country_code.as_str()]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect();
    if !place.is_empty() {
        contact.push(escape_html(&place.join(", ")));
    }
    for profile in &basics.profiles {
        if let Some(href) = safe_href(&profile.url) {
            contact.push(format!("<a href=\"{href}\">{}</a>", escape_html(&profile.network)));
        }
    }
    let _ = write!(out, "<p class=\"contact\">{}</p></header>", contact.join(" · "));

    if !basics.summary.is_empty() {
        let _ = write!(out, "<section><h2>{}</h2><p>{}</p></section>", h.summary, escape_html(&basics.summary));
    }

    if !resume.work.is_empty() {
        let _ = write!(out, "<section><h2>{}</h2>", h.experience);
        for job in &resume.work {
            out.push_str("<div class=\"entry\">");
            entry_head(&mut out, &job.position, &date_range(&job.start_date, &job.end_date));
            let org: Vec<&str> = [job.company.as_str(), job.location.as_str()]
                .into_iter()
                .filter(|p| !p.is_empty())
                .collect();
            if !org.is_empty() {
                let _ = write!(out, "<div class=\"sub\">{}</div>", escape_html(&org.join(" · ")));
            }
            if !job.summary.is_empty() {
                let _ = write!(out, "<p>{}</p>", escape_html(&job.summary));
            }
            bullet_list(&mut out, &job.highlights);
            out.push_str("</div>");
        }
        out.push_str("</section>");
    }

    if !resume.skills.is_empty() {
        let _ = write!(out, "<section><h2>{}</h2><dl class=\"skills\">", h.skills);
        for group in &resume.skills {
            let _ = write!(
                out,
                "<dt>{}</dt><dd>{}</dd>",
                escape_html(&group.name),
                escape_html(&group.keywords.join(", "))
            );
        }
        out.push_str("</dl></section>");
    }

    if !resume.education.is_empty() {
        let _ = write!(out, "<section><h2>{}</h2>", h.education);
        for school in &resume.education {
            out.push_str("<div class=\"entry\">");
            let title = [school.study_type.as_str(), school.area.as_str()]
                .into_iter()
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join(", ");
            entry_head(&mut out, &title, &date_range(&school.start_date, &school.end_date));
            if !school.institution.is_empty() {
                let _ = write!(out, "<div class=\"sub\">{}</div>", escape_html(&school.institution));
            }
            if !school.courses.is_empty() {
                let _ = write!(
                    out,
                    "<p><strong>{}:</strong> {}</p>",
                    h.courses,
                    escape_html(&school.courses.join(", "))
                );
            }
            out.push_str("</div>");
        }
        out.push_str("</section>");
    }

    if !resume.awards.is_empty() {
        let _ = write!(out, "<section><h2>{}</h2>", h.certifications);
        for award in &resume.awards {
            out.push_str("<div class=\"entry\">");
            let title = match safe_href(&award.link) {
                Some(href) => format!("<a href=\"{href}\">{}</a>", escape_html(&award.title)),
                None => escape_html(&award.title),
            };
            let _ = write!(
                out,
                "<div class=\"entry-head\"><span>{title}</span><span class=\"dates\">{}</span></div>",
                escape_html(&award.date)
            );
            if !award.awarder.is_empty() {
                let _ = write!(out, "<div class=\"sub\">{}</div>", escape_html(&award.awarder));
            }
            out.push_str("</div>");
        }
        out.push_str("</section>");
    }

    if !resume.projects.is_empty() {
        let _ = write!(out, "<section><h2>{}</h2>", h.projects);
        for project in &resume.projects {
            out.push_str("<div class=\"entry\">");
            entry_head(&mut out, &project.name, "");
            if !project.description.is_empty() {
                let _ = write!(out, "<p>{}</p>", escape_html(&project.description));
            }
            if !project.keywords.is_empty() {
                let _ = write!(out, "<div class=\"sub\">{}</div>", escape_html(&project.keywords.join(", ")));
            }
            out.push_str("</div>");
        }
        out.push_str("</section>");
    }

    if !resume.languages.is_empty() {
        let _ = write!(out, "<section><h2>{}</h2><ul>", h.languages);
        for spoken in &resume.languages {
            let _ = write!(
                out,
                "<li>{} ({})</li>",
                escape_html(&spoken.language),
                escape_html(&spoken.fluency)
            );
        }
        out.push_str("</ul></section>");
    }

    out.push_str("</body></html>");
    out
}
