use crate::model::{Layout, Meta};

/// Build a basic Apple plist (XML) with frames in a dict keyed by name.
/// Frame rects use the `{{x,y},{w,h}}` string form; meta carries the sheet size
/// and, when known, the sheet image file name.
pub fn to_plist_hash<K: ToString>(layout: &Layout<K>, meta: &Meta) -> String {
    let mut s = String::new();
    s.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
  <key>frames</key>
  <dict>
"#);
    for fr in &layout.frames {
        let name = fr.key.to_string();
        let frame = format!(
            "{{{{{},{}}},{{{},{}}}}}",
            fr.frame.x, fr.frame.y, fr.frame.w, fr.frame.h
        );
        s.push_str(&format!(
            "    <key>{}</key>\n    <dict>\n      <key>frame</key><string>{}</string>\n      <key>sourceSize</key><string>{{{}, {}}}</string>\n    </dict>\n",
            xml_escape(&name),
            frame,
            fr.frame.w, fr.frame.h,
        ));
    }
    s.push_str("  </dict>\n");
    s.push_str("  <key>meta</key>\n  <dict>\n");
    if let Some(image) = &meta.image {
        s.push_str(&format!(
            "    <key>textureFileName</key><string>{}</string>\n",
            xml_escape(image)
        ));
    }
    s.push_str(&format!(
        "    <key>app</key><string>{}</string>\n    <key>version</key><string>{}</string>\n    <key>format</key><string>{}</string>\n    <key>size</key><string>{{{}, {}}}</string>\n",
        xml_escape(&meta.app),
        xml_escape(&meta.version),
        xml_escape(&meta.format),
        meta.size.width,
        meta.size.height,
    ));
    s.push_str("  </dict>\n</dict>\n</plist>\n");
    s
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
