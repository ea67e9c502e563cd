//! The three HTML pages the service renders.
use axum::response::Html;
use filedrop_common::FileRecord;

/// Escape text for use in HTML element content and quoted attributes
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n<h1>{title}</h1>\n{body}</body>\n</html>\n"
    ))
}

fn message(msg: Option<&str>) -> String {
    msg.map(|m| format!("<p class=\"msg\">{}</p>\n", escape_html(m)))
        .unwrap_or_default()
}

fn credentials_form(action: &str, submit: &str) -> String {
    format!(
        "<form action=\"{action}\" method=\"post\">\n\
         <input type=\"text\" name=\"username\" placeholder=\"Username\" required>\n\
         <input type=\"password\" name=\"password\" placeholder=\"Password\" required>\n\
         <button type=\"submit\">{submit}</button>\n\
         </form>\n"
    )
}

pub fn register_page(msg: Option<&str>) -> Html<String> {
    let body = format!(
        "{}{}<p><a href=\"/login\">Already registered? Log in</a></p>\n",
        message(msg),
        credentials_form("/register", "Register"),
    );
    layout("Register", &body)
}

pub fn login_page(msg: Option<&str>) -> Html<String> {
    let body = format!(
        "{}{}<p><a href=\"/register\">No account? Register</a></p>\n",
        message(msg),
        credentials_form("/token", "Log in"),
    );
    layout("Login", &body)
}

/// Upload form plus the user's files with download/delete links
pub fn upload_page(username: &str, files: &[FileRecord]) -> Html<String> {
    let mut body = format!("<p>Signed in as {}</p>\n", escape_html(username));
    body.push_str(
        "<form action=\"/uploadfile\" method=\"post\" enctype=\"multipart/form-data\">\n\
         <input type=\"file\" name=\"files\" multiple required>\n\
         <button type=\"submit\">Upload</button>\n\
         </form>\n",
    );

    if files.is_empty() {
        body.push_str("<p>No files uploaded yet.</p>\n");
    } else {
        body.push_str("<ul>\n");
        for file in files {
            let href = escape_html(&urlencoding::encode(&file.filename));
            body.push_str(&format!(
                "<li>{} <a href=\"/download/{href}\">download</a> <a href=\"/delete/{href}\">delete</a></li>\n",
                escape_html(&file.filename),
            ));
        }
        body.push_str("</ul>\n");
    }

    layout("Your files", &body)
}
