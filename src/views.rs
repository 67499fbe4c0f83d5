//! HTML pages. Every interpolated value goes through [`escape`].

use std::fmt::Write;

use crate::auth::AuthInfo;
use crate::device::{display_mac, Device, Vlan};

pub fn escape(raw: &str) -> String {
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

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape(title),
        body
    )
}

fn vlan_options(selected: Option<Vlan>) -> String {
    let mut out = String::new();
    for vlan in Vlan::ALL {
        let marker = if Some(vlan) == selected { " selected" } else { "" };
        let _ = writeln!(
            out,
            "<option value=\"{0}\"{1}>{0}</option>",
            vlan.as_str(),
            marker
        );
    }
    out
}

pub fn landing(caller: &AuthInfo) -> String {
    let groups = if caller.groups.is_empty() {
        "(none)".to_string()
    } else {
        escape(&caller.groups.join(", "))
    };
    let body = format!(
        "<h1>Intern</h1>\n\
         <p>Signed in as <strong>{}</strong> ({})</p>\n\
         <p>Email: {}</p>\n\
         <p>Groups: {}</p>\n\
         <p>Sudoer: {}</p>\n\
         <p><a href=\"/devices\">Manage devices</a></p>",
        escape(&caller.name),
        escape(&caller.username),
        escape(&caller.email),
        groups,
        if caller.is_sudoer() { "yes" } else { "no" },
    );
    page("Intern", &body)
}

pub fn device_list(devices: &[Device]) -> String {
    let mut rows = String::new();
    for device in devices {
        let mac = escape(&device.mac);
        let _ = writeln!(
            rows,
            "<tr><td>{}</td><td><code>{}</code></td><td>{}</td><td>{}</td>\
             <td><a href=\"/devices/edit/{mac}\">Edit</a> \
             <form method=\"post\" action=\"/devices/delete/{mac}\" style=\"display:inline\">\
             <button type=\"submit\">Delete</button></form></td></tr>",
            escape(&device.display_mac()),
            mac,
            escape(&device.description),
            device.vlan,
        );
    }
    if devices.is_empty() {
        rows.push_str("<tr><td colspan=\"5\">No devices</td></tr>\n");
    }

    let body = format!(
        "<h1>Devices</h1>\n\
         <p><a href=\"/devices/add\">Add device</a></p>\n\
         <table>\n<thead><tr><th>MAC</th><th>Username</th><th>Description</th>\
         <th>VLAN</th><th></th></tr></thead>\n<tbody>\n{}</tbody>\n</table>",
        rows
    );
    page("Devices", &body)
}

pub fn add_form() -> String {
    let body = format!(
        "<h1>Add device</h1>\n\
         <form method=\"post\" action=\"/devices/add\">\n\
         <label>MAC <input name=\"mac\" pattern=\"[0-9a-f]{{12}}\" required></label>\n\
         <label>Description <input name=\"description\"></label>\n\
         <label>VLAN <select name=\"vlan\">\n{}</select></label>\n\
         <button type=\"submit\">Add</button>\n\
         </form>\n<p><a href=\"/devices\">Back</a></p>",
        vlan_options(None)
    );
    page("Add device", &body)
}

pub fn edit_form(device: &Device) -> String {
    let mac = escape(&device.mac);
    let body = format!(
        "<h1>Edit device {}</h1>\n\
         <form method=\"post\" action=\"/devices/edit/{}\">\n\
         <input type=\"hidden\" name=\"mac\" value=\"{}\">\n\
         <label>Description <input name=\"description\" value=\"{}\"></label>\n\
         <label>VLAN <select name=\"vlan\">\n{}</select></label>\n\
         <button type=\"submit\">Save</button>\n\
         </form>\n<p><a href=\"/devices\">Back</a></p>",
        escape(&display_mac(&device.mac)),
        mac,
        mac,
        escape(&device.description),
        vlan_options(Some(device.vlan))
    );
    page("Edit device", &body)
}

pub fn public_home() -> String {
    page(
        "Home",
        "<h1>Welcome</h1>\n<p><a href=\"/resume\">Resume</a> | <a href=\"/blog\">Blog</a></p>",
    )
}

pub fn public_resume() -> String {
    page("Resume", "<h1>Resume</h1>\n<p><a href=\"/\">Home</a></p>")
}

pub fn public_blog() -> String {
    page("Blog", "<h1>Blog</h1>\n<p>No posts yet.</p>\n<p><a href=\"/\">Home</a></p>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape("<script>alert(\"x\" & 'y')</script>"),
            "&lt;script&gt;alert(&quot;x&quot; &amp; &#x27;y&#x27;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_edit_form_selects_current_vlan_and_escapes_description() {
        let device = Device {
            mac: "aabbccddeeff".into(),
            description: "<b>Printer</b>".into(),
            vlan: Vlan::Iot,
        };
        let html = edit_form(&device);

        assert!(html.contains("<option value=\"iot\" selected>iot</option>"));
        assert!(html.contains("<option value=\"trusted\">trusted</option>"));
        assert!(html.contains("value=\"&lt;b&gt;Printer&lt;/b&gt;\""));
        assert!(html.contains("aa:bb:cc:dd:ee:ff"));
        assert!(!html.contains("<b>Printer</b>"));
    }

    #[test]
    fn test_device_list_shows_both_mac_forms() {
        let html = device_list(&[Device {
            mac: "001122334455".into(),
            description: "Camera".into(),
            vlan: Vlan::Guest,
        }]);
        assert!(html.contains("00:11:22:33:44:55"));
        assert!(html.contains("/devices/edit/001122334455"));
        assert!(html.contains("<td>guest</td>"));
    }

    #[test]
    fn test_landing_reports_sudoer() {
        let html = landing(&AuthInfo::development());
        assert!(html.contains("dev_user"));
        assert!(html.contains("Sudoer: yes"));
    }
}
