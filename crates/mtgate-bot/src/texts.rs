//! User-facing message catalog.
//!
//! Logs stay in English; only messages sent to chat users are
//! translated. Unknown language codes fall back to English.

use mtgate_core::NoticeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    En,
    Fa,
}

impl Lang {
    pub fn from_code(code: &str) -> Self {
        match code {
            "fa" => Self::Fa,
            _ => Self::En,
        }
    }
}

pub fn notice_text(lang: Lang, kind: NoticeKind) -> &'static str {
    match (lang, kind) {
        (Lang::En, NoticeKind::WelcomeNew) => {
            "Welcome to the channel! Your free MTProxy is ready."
        }
        (Lang::En, NoticeKind::WelcomeBack) => {
            "Welcome back to the channel! Your MTProxy has been reactivated."
        }
        (Lang::En, NoticeKind::Deactivated) => {
            "Your MTProxy has been deactivated because you left the channel.\n\nJoin the channel again to automatically get a new proxy!"
        }
        (Lang::Fa, NoticeKind::WelcomeNew) => {
            "به کانال خوش آمدید! پروکسی رایگان شما آماده است."
        }
        (Lang::Fa, NoticeKind::WelcomeBack) => {
            "به کانال خوش آمدید! پروکسی شما مجدداً فعال شد."
        }
        (Lang::Fa, NoticeKind::Deactivated) => {
            "پروکسی شما به دلیل خروج از کانال غیرفعال شد.\n\nمجدداً در کانال عضو شوید تا پروکسی جدید به صورت خودکار دریافت کنید!"
        }
    }
}

pub fn proxy_ready(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "Your proxy is ready. Tap the link below to connect:",
        Lang::Fa => "پروکسی شما آماده است. برای اتصال روی لینک زیر کلیک کنید:",
    }
}

pub fn must_join_first(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "To get your free MTProxy, you need to join our channel first!",
        Lang::Fa => "برای دریافت پروکسی رایگان، ابتدا باید در کانال ما عضو شوید!",
    }
}

pub fn membership_check_failed(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "Error checking channel membership. Please try again later.",
        Lang::Fa => "خطا در بررسی عضویت کانال. لطفاً دوباره تلاش کنید.",
    }
}

pub fn creation_failed(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "Error creating proxy. Please try again later.",
        Lang::Fa => "خطا در ایجاد پروکسی. لطفاً بعداً تلاش کنید.",
    }
}

pub fn rate_limited(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "Too many requests. Please wait a minute and try again.",
        Lang::Fa => "درخواست‌های زیادی ارسال شده است. لطفاً یک دقیقه صبر کنید و دوباره تلاش کنید.",
    }
}

pub fn restart_succeeded(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "MTProxy restarted. All user proxies should be working normally.",
        Lang::Fa => "MTProxy مجدداً راه‌اندازی شد. همه پروکسی‌های کاربران باید به طور عادی کار کنند.",
    }
}

pub fn restart_failed(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "MTProxy restart failed. Please check the service manually: systemctl status MTProxy",
        Lang::Fa => "راه‌اندازی مجدد MTProxy ناموفق بود. لطفاً سرویس را به صورت دستی بررسی کنید: systemctl status MTProxy",
    }
}

pub fn access_denied(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "Access denied.",
        Lang::Fa => "دسترسی مجاز نیست.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_code_falls_back_to_english() {
        assert_eq!(Lang::from_code("de"), Lang::En);
        assert_eq!(Lang::from_code(""), Lang::En);
    }

    #[test]
    fn test_farsi_is_selected() {
        assert_eq!(Lang::from_code("fa"), Lang::Fa);
        assert_ne!(
            notice_text(Lang::Fa, NoticeKind::WelcomeNew),
            notice_text(Lang::En, NoticeKind::WelcomeNew)
        );
    }

    #[test]
    fn test_every_notice_kind_has_text() {
        for kind in [
            NoticeKind::WelcomeNew,
            NoticeKind::WelcomeBack,
            NoticeKind::Deactivated,
        ] {
            assert!(!notice_text(Lang::En, kind).is_empty());
            assert!(!notice_text(Lang::Fa, kind).is_empty());
        }
    }
}
