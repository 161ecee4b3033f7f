use std::sync::OnceLock;
use tera::Tera;

static TERA: OnceLock<Tera> = OnceLock::new();

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("landing.html", include_str!("../templates/landing.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("dashboard.html", include_str!("../templates/dashboard.html")),
    ("batches.html", include_str!("../templates/batches.html")),
    ("batch_detail.html", include_str!("../templates/batch_detail.html")),
    ("queue.html", include_str!("../templates/queue.html")),
    ("upload.html", include_str!("../templates/upload.html")),
    ("upload_status.html", include_str!("../templates/upload_status.html")),
    ("not_found.html", include_str!("../templates/not_found.html")),
];

pub fn get_tera() -> &'static Tera {
    TERA.get_or_init(|| {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.iter().copied())
            .expect("Failed to load templates");
        tera
    })
}
