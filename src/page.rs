//! Server-rendered HTML for the single page.

use crate::config::ENV_TEMPLATE;
use crate::render::ResultView;
use crate::session::{Session, Stage, Startup};

const TITLE: &str = "Computer Vision with Rust";

/// Render the whole page for one session.
///
/// Terminal startup states show remediation and nothing else.
pub fn render(startup: &Startup, session: &Session) -> String {
    let mut body = String::new();
    body.push_str(&format!("<h1>👁️ {TITLE}</h1>\n"));
    body.push_str("<p class=\"subtitle\">Rust + Azure Computer Vision</p>\n");

    match startup {
        Startup::ConfigInvalid(_) => body.push_str(&config_missing()),
        Startup::ClientInvalid(e) => body.push_str(&format!(
            "<div class=\"error\">❌ Cannot connect to the vision service. Please check your credentials.</div>\n\
             <p class=\"upload-hint\">{}</p>\n",
            escape(&e.to_string())
        )),
        Startup::Ready(_) => body.push_str(&ready(session)),
    }

    layout(&body)
}

fn config_missing() -> String {
    format!(
        "<div class=\"error\">❌ Missing vision credentials! Please check your .env file contains:</div>\n\
         <pre class=\"code\">{}</pre>\n\
         <div class=\"info\">💡 Make sure your .env file is in the directory the server is started from</div>\n",
        escape(ENV_TEMPLATE)
    )
}

fn ready(session: &Session) -> String {
    let mut out = String::new();

    out.push_str(
        "<form class=\"upload-area\" action=\"/upload\" method=\"post\" enctype=\"multipart/form-data\">\n\
         <div class=\"upload-icon\">📸</div>\n\
         <label class=\"upload-text\" for=\"fileInput\">Choose image</label>\n\
         <div class=\"upload-hint\">JPG / JPEG only</div>\n\
         <input type=\"file\" id=\"fileInput\" name=\"image\" accept=\".jpg,.jpeg,image/jpeg\" onchange=\"this.form.submit()\">\n\
         <noscript><button type=\"submit\">Upload</button></noscript>\n\
         </form>\n",
    );

    if let Some(image) = session.upload() {
        out.push_str(&format!(
            "<div class=\"preview-container\">\n\
             <img class=\"preview-image\" src=\"{}\" alt=\"Uploaded image\">\n\
             <p class=\"image-caption\">Uploaded image</p>\n\
             <form action=\"/analyze\" method=\"post\"><button class=\"analyze\" type=\"submit\">Analyze image</button></form>\n\
             </div>\n",
            image.data_url()
        ));
    }

    if let Some(error) = session.error() {
        out.push_str(&format!("<div class=\"error\">{}</div>\n", escape(error)));
    }

    if session.stage() == Stage::Rendered {
        if let Some(view) = session.view() {
            out.push_str(&result_html(&view));
        }
    }

    out
}

fn result_html(view: &ResultView) -> String {
    let mut out = String::from("<div class=\"result\">\n");

    if let Some(caption) = &view.caption {
        out.push_str(&format!(
            "<div class=\"result-label\">Caption:</div>\n\
             <div class=\"result-text\">{}</div>\n\
             <div class=\"meta-info\">Confidence: {}</div>\n",
            escape(&caption.text),
            caption.confidence
        ));
    }

    if let Some(tags) = &view.tags {
        out.push_str("<div class=\"result-label\">Tags</div>\n<div class=\"tag-columns\">\n");

        out.push_str("<div><strong>Tag</strong>\n");
        for row in &tags.columns {
            out.push_str(&format!("<div>• {}</div>\n", escape(&row.name)));
        }
        out.push_str("</div>\n<div><strong>Confidence</strong>\n");
        for row in &tags.columns {
            out.push_str(&format!("<div>{}</div>\n", row.confidence));
        }
        out.push_str("</div>\n</div>\n");

        out.push_str("<p><strong>All Tags:</strong></p>\n");
        for (i, row) in tags.numbered.iter().enumerate() {
            out.push_str(&format!(
                "<div class=\"tag-line\">{}. <strong>{}</strong> - {}</div>\n",
                i + 1,
                escape(&row.name),
                row.confidence
            ));
        }
    }

    if let Some(colors) = &view.colors {
        out.push_str(&format!("<div class=\"meta-info\">{}</div>\n", escape(colors)));
    }

    out.push_str("</div>\n");
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{TITLE}</title>
    <style>
        * {{ margin: 0; padding: 0; box-sizing: border-box; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            min-height: 100vh;
            display: flex;
            justify-content: center;
            padding: 20px;
        }}
        .container {{
            background: white;
            border-radius: 20px;
            box-shadow: 0 20px 60px rgba(0,0,0,0.3);
            max-width: 800px;
            width: 100%;
            padding: 40px;
        }}
        h1 {{ color: #333; margin-bottom: 10px; font-size: 2em; }}
        .subtitle {{ color: #666; margin-bottom: 30px; font-size: 0.9em; }}
        .upload-area {{
            display: block;
            border: 3px dashed #667eea;
            border-radius: 15px;
            padding: 40px 20px;
            text-align: center;
            background: #f8f9ff;
        }}
        .upload-icon {{ font-size: 3em; margin-bottom: 10px; }}
        .upload-text {{ color: #667eea; font-size: 1.2em; font-weight: 600; cursor: pointer; }}
        .upload-hint {{ color: #999; font-size: 0.9em; margin: 10px 0; }}
        .preview-container {{ margin-top: 30px; text-align: center; }}
        .preview-image {{ max-width: 100%; border-radius: 10px; box-shadow: 0 4px 15px rgba(0,0,0,0.1); }}
        .image-caption {{ color: #666; font-size: 0.85em; margin: 8px 0 16px; }}
        .analyze {{
            background: #667eea;
            color: white;
            border: none;
            padding: 10px 24px;
            border-radius: 20px;
            font-weight: 600;
            cursor: pointer;
        }}
        .result {{ background: #f8f9ff; border-radius: 10px; padding: 20px; margin-top: 20px; }}
        .result-label {{
            color: #667eea;
            font-weight: 600;
            margin: 10px 0;
            font-size: 0.9em;
            text-transform: uppercase;
            letter-spacing: 1px;
        }}
        .result-text {{ color: #333; font-size: 1.1em; line-height: 1.6; }}
        .meta-info {{ margin-top: 10px; font-size: 0.85em; color: #666; }}
        .tag-columns {{ display: grid; grid-template-columns: 1fr 1fr; gap: 10px; margin-bottom: 15px; }}
        .tag-line {{ line-height: 1.6; }}
        .code {{ background: #f4f4f4; padding: 15px; border-radius: 10px; margin-top: 15px; white-space: pre-wrap; }}
        .info {{ background: #eef4ff; color: #335; padding: 15px; border-radius: 10px; margin-top: 15px; }}
        .error {{
            background: #fee;
            border: 2px solid #fcc;
            color: #c33;
            padding: 15px;
            border-radius: 10px;
            margin-top: 20px;
        }}
    </style>
</head>
<body>
    <div class="container">
{body}
    </div>
</body>
</html>
"#
    )
}
