//! Public Renderer
//!
//! Pure functions turning menu, footer and settings records into the markup the public
//! site embeds. Handlers in `handlers.rs` expose them under `/partials/*`.

use crate::{
    models::{FooterLink, MenuItem, SiteSetting},
    settings::{self, lookup},
};

pub const DEFAULT_FONT: &str = "Inter";
pub const DEFAULT_TITLE_COLOR: &str = "#004080";
pub const DEFAULT_BODY_COLOR: &str = "#374151";
pub const DEFAULT_LOGO: &str = "/assets/logo.png";

/// Footer section rendered as the "useful links" column.
pub const SECTION_USEFUL_LINKS: &str = "link_utili";
/// Footer section rendered in the bottom bar.
pub const SECTION_INFO: &str = "info";

/// Scroll-reveal script: adds `anim-active` to every `.anim-box` once 10% of it is visible.
/// Observation starts after a short delay so page-builder blocks are already in the DOM.
pub const REVEAL_SCRIPT: &str = r#"(function () {
  var observer = new IntersectionObserver(function (entries) {
    entries.forEach(function (entry) {
      if (entry.isIntersecting) {
        entry.target.classList.add('anim-active');
      }
    });
  }, { threshold: 0.1 });

  setTimeout(function () {
    document.querySelectorAll('.anim-box').forEach(function (el) { observer.observe(el); });
  }, 500);
})();
"#;

const ANIMATION_CSS: &str = r#"
.anim-box { opacity: 0; transition: all 1s ease-out; will-change: transform, opacity; }
.anim-active { opacity: 1; transform: translate(0,0) scale(1) rotate(0) !important; }
.anim-fade-up { transform: translateY(50px); }
.anim-fade-down { transform: translateY(-50px); }
.anim-fade-left { transform: translateX(-50px); }
.anim-fade-right { transform: translateX(50px); }
.anim-zoom-in { transform: scale(0.8); }
.anim-flip { transform: rotateY(90deg); }
"#;

const NAV_LINK_CLASS: &str = "flex items-center font-bold text-sm uppercase tracking-wide hover:opacity-80 transition px-3 h-full border-b-4 border-transparent hover:border-current";

/// ThemeSettings
///
/// Presentation settings with their defaults applied. Empty values count as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeSettings {
    pub font: String,
    pub title_color: String,
    pub body_color: String,
    pub custom_css: String,
    pub favicon: String,
    pub logo: String,
    pub custom_js_head: String,
    pub maintenance_mode: bool,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self::from_settings(&[])
    }
}

impl ThemeSettings {
    pub fn from_settings(settings: &[SiteSetting]) -> Self {
        let value = |key: &str, default: &str| lookup(settings, key).unwrap_or(default).to_string();

        Self {
            font: value(settings::STYLE_FONT, DEFAULT_FONT),
            title_color: value(settings::STYLE_TITLE_COLOR, DEFAULT_TITLE_COLOR),
            body_color: value(settings::STYLE_BODY_COLOR, DEFAULT_BODY_COLOR),
            custom_css: value(settings::CUSTOM_CSS, ""),
            favicon: value(settings::SITE_FAVICON, DEFAULT_LOGO),
            logo: value(settings::SITE_LOGO, DEFAULT_LOGO),
            custom_js_head: value(settings::CUSTOM_JS_HEAD, ""),
            maintenance_mode: lookup(settings, settings::MAINTENANCE_MODE) == Some("true"),
        }
    }
}

/// Escapes text for use in element content and double-quoted attributes.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Global stylesheet: typography, colours, animation classes, then the admin's custom CSS
/// (emitted verbatim, last, so it can override everything above).
pub fn render_theme_css(theme: &ThemeSettings) -> String {
    format!(
        "body {{ font-family: '{font}', sans-serif !important; color: {body} !important; }}\n\
         h1, h2, h3, .font-bold {{ color: {title}; }}\n\
         .text-\\[\\#004080\\], .text-blue-900 {{ color: {title} !important; }}\n\
         {animations}\n\
         /* Custom CSS */\n\
         {custom}\n",
        font = theme.font,
        body = theme.body_color,
        title = theme.title_color,
        animations = ANIMATION_CSS.trim(),
        custom = theme.custom_css,
    )
}

/// `<head>` fragment: favicon, theme stylesheet and the admin's head script, if any.
pub fn render_head(theme: &ThemeSettings) -> String {
    let mut head = format!(
        "<link rel=\"icon\" href=\"{}\">\n<style>\n{}</style>\n",
        escape_html(&theme.favicon),
        render_theme_css(theme)
    );
    if !theme.custom_js_head.is_empty() {
        head.push_str(&format!("<script>\n{}\n</script>\n", theme.custom_js_head));
    }
    head
}

fn render_nav_item(item: &MenuItem) -> String {
    let url = escape_html(&item.url);
    let label = escape_html(&item.label);

    if item.children.is_empty() {
        return format!("<a href=\"{url}\" class=\"{NAV_LINK_CLASS}\">{label}</a>");
    }

    let children: String = item
        .children
        .iter()
        .map(|child| {
            format!(
                "<a href=\"{}\" class=\"block px-6 py-3 text-sm text-gray-600 hover:bg-gray-50 border-b border-gray-100 last:border-0\">{}</a>",
                escape_html(&child.url),
                escape_html(&child.label)
            )
        })
        .collect();

    format!(
        "<div class=\"relative group h-full flex items-center\">\
         <a href=\"{url}\" class=\"{NAV_LINK_CLASS}\">{label} \
         <svg class=\"w-3 h-3 ml-1 opacity-50\" fill=\"none\" stroke=\"currentColor\" viewBox=\"0 0 24 24\">\
         <path stroke-linecap=\"round\" stroke-linejoin=\"round\" stroke-width=\"2\" d=\"M19 9l-7 7-7-7\"/></svg></a>\
         <div class=\"absolute top-full left-0 w-60 bg-white shadow-xl rounded-b-xl border-t-4 border-current opacity-0 invisible group-hover:opacity-100 group-hover:visible transition-all duration-200 z-50 overflow-hidden flex flex-col\">\
         {children}</div></div>"
    )
}

/// Navigation bar. Items with children become hover dropdowns; only the first level
/// of children is rendered.
pub fn render_header(menu: &[MenuItem], theme: &ThemeSettings) -> String {
    let nav_links: String = menu.iter().map(render_nav_item).collect();

    format!(
        "<nav class=\"bg-white/95 backdrop-blur-md fixed w-full z-50 top-0 shadow-sm border-b border-gray-100 h-24\">\n\
         <div class=\"max-w-7xl mx-auto px-4 h-full flex justify-between items-center\">\n\
         <a href=\"/\" class=\"flex-shrink-0 hover:opacity-80 transition\">\
         <img src=\"{logo}\" class=\"site-logo-img h-16 w-auto object-contain\" alt=\"logo\"></a>\n\
         <div class=\"hidden md:flex space-x-2 h-full items-center\">{nav_links}</div>\n\
         <a href=\"/admin.html\" class=\"bg-[#004080] text-white px-6 py-2.5 rounded-full text-xs font-bold uppercase tracking-wider\">Area Riservata</a>\n\
         </div>\n</nav>\n",
        logo = escape_html(&theme.logo),
    )
}

/// Links of one footer section, in (position, id) order.
pub fn section_links<'a>(links: &'a [FooterLink], section: &str) -> Vec<&'a FooterLink> {
    let mut selected: Vec<&FooterLink> = links.iter().filter(|l| l.section == section).collect();
    selected.sort_by_key(|l| (l.position, l.id));
    selected
}

fn render_link_list(links: &[&FooterLink], class: &str) -> String {
    links
        .iter()
        .map(|link| {
            format!(
                "<li><a href=\"{}\" class=\"{class}\">{}</a></li>",
                escape_html(&link.url),
                escape_html(&link.label)
            )
        })
        .collect()
}

/// Footer: a "useful links" column and an info row in the bottom bar.
/// Links from any other section are not rendered.
pub fn render_footer(links: &[FooterLink], theme: &ThemeSettings) -> String {
    let useful = render_link_list(
        &section_links(links, SECTION_USEFUL_LINKS),
        "text-blue-200 hover:text-white transition",
    );
    let info = render_link_list(&section_links(links, SECTION_INFO), "hover:text-white");

    format!(
        "<footer class=\"bg-[#002b55] text-white pt-16 pb-8 border-t-4 border-[#e63946] mt-auto\">\n\
         <div class=\"max-w-7xl mx-auto px-4 grid grid-cols-1 md:grid-cols-2 gap-12 text-sm mb-12\">\n\
         <div><img src=\"{logo}\" class=\"site-logo-img h-12 mb-6 bg-white p-2 rounded-lg object-contain\" alt=\"logo\"></div>\n\
         <div><h4 class=\"font-bold text-white text-base uppercase tracking-wider mb-6\">Link Utili</h4>\n\
         <ul class=\"space-y-3\">{useful}</ul></div>\n\
         </div>\n\
         <div class=\"border-t border-blue-900 pt-8 px-4 max-w-7xl mx-auto flex justify-between items-center\">\n\
         <ul class=\"flex gap-4 text-xs text-blue-400\">{info}</ul>\n\
         </div>\n</footer>\n",
        logo = escape_html(&theme.logo),
    )
}

/// Full-page maintenance notice, or None when maintenance mode is off.
pub fn render_maintenance(theme: &ThemeSettings) -> Option<String> {
    if !theme.maintenance_mode {
        return None;
    }

    Some(format!(
        "<div class=\"h-screen flex flex-col items-center justify-center bg-gray-100 font-sans\" style=\"color: {color}\">\n\
         <img src=\"{logo}\" class=\"h-24 mb-8\">\n\
         <h1 class=\"text-4xl font-bold mb-4\">Sito in Manutenzione</h1>\n\
         <p class=\"text-gray-600 text-lg\">Stiamo aggiornando i nostri sistemi. Torneremo presto online.</p>\n\
         </div>\n",
        color = escape_html(&theme.title_color),
        logo = escape_html(&theme.logo),
    ))
}
