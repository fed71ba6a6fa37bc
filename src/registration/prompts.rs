//! User-facing texts and button sets for every step.

use super::package::Package;
use super::step::Step;

pub const WELCOME_TEXT: &str = "Дорогие выпускники!

В этом году на МБ25 мы хотим предоставить вам возможность снова стать частью конференции! Для этого мы придумали специальную программу для выпускников. Вы сможете посетить деловую программу третьего дня, послушать выступления и дискуссии уважаемых спикеров, а также принять участие в нетворкинге - развить свои софтскиллы и приобрести ценные деловые контакты.";

pub const PROGRAM_TEXT: &str = "<b>3-й день: Личностное развитие</b>

Завершающий день конференции посвящен развитию креативности и личной эффективности. Спикеры раскроют секреты становления успешным специалистом и определят ключевые софт скиллы, необходимые в современной карьере. В программе — интерактивные дискуссии о роли творческого мышления в бизнесе и нетворкинг-сессии для создания профессиональных связей.

Подробная программа дня появится позже. Жди уведомлений в боте!";

pub const PACKAGES_TEXT: &str = "Мы предлагаем посетить конференцию в третий день - 25 октября. Есть три варианта участия:

1. Деловая программа - участие в мероприятиях третьего дня конференции (25 октября).
Вас ждут интересные лекции от топовых спикеров, панельные дискуссии на актуальные темы, а также интерактивное мероприятие для выпускников с перерывом на нетворкинг.
Стоимость: 2 990р

2. Гала-ужин - закрытие конференции в ресторане с панорамным видом на Петербург.
Ваш шанс за бокалом игристого пообщаться с нынешними участниками конференции.
Стоимость: 3 490р

3. Деловая программа и гала-ужин - целый день интересных мероприятий и прекрасный праздник вечером.
Стоимость: 5 990р

Чтобы попасть в лист ожидания, выбери пакет участия, который тебе наиболее интересен.";

pub const FIRST_NAME_TEXT: &str = "Введите ваше имя:\n\nПример: Иван";
pub const LAST_NAME_TEXT: &str = "Введите вашу фамилию:\n\nПример: Иванов";
pub const PARTICIPATED_TEXT: &str = "Участвовал ли ты в МБ ранее?";
pub const PARTICIPATION_YEAR_TEXT: &str = "В каком году ты участвовал в МБ?";
pub const GRADUATE_TEXT: &str = "Ты выпускник ВШМ?";
pub const GRADUATION_YEAR_TEXT: &str = "В каком году ты окончил ВШМ?";

pub const COMPLETION_TEXT: &str =
    "Спасибо, что зарегистрировался! В этот бот придет уведомление, когда откроются продажи. Не пропусти!";

pub const FIRST_NAME_TOO_SHORT: &str = "Имя должно содержать минимум 2 символа. Попробуйте еще раз.";
pub const LAST_NAME_TOO_SHORT: &str =
    "Фамилия должна содержать минимум 2 символа. Попробуйте еще раз.";
pub const INVALID_PARTICIPATION_YEAR: &str = "Введите корректный год участия (например, 2023).";
pub const INVALID_GRADUATION_YEAR: &str = "Введите корректный год выпуска (например, 2020).";

/// Shown when a collaborator (session store) is unavailable for this turn.
pub const RETRY_LATER_TEXT: &str = "Сервис временно недоступен. Попробуйте позже.";

/// Shown when the primary store rejected the registration.
pub const REGISTRATION_FAILED_TEXT: &str =
    "Не удалось сохранить регистрацию. Отправьте любое сообщение, чтобы повторить.";

/// Navigation option identifiers on the informational screens.
pub const HOW_TO_PARTICIPATE: &str = "how_to_participate";
pub const SHOW_PROGRAM: &str = "show_program";

pub const YES: &str = "yes";
pub const NO: &str = "no";

/// An inline button: visible label plus the option identifier it submits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Renderable content of one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub text: String,
    pub buttons: Vec<Button>,
}

impl Screen {
    fn text_only(text: &str) -> Self {
        Self {
            text: text.to_string(),
            buttons: Vec::new(),
        }
    }

    fn with_buttons(text: &str, buttons: Vec<Button>) -> Self {
        Self {
            text: text.to_string(),
            buttons,
        }
    }
}

fn yes_no() -> Vec<Button> {
    vec![Button::new("Да", YES), Button::new("Нет", NO)]
}

/// Content to render when the conversation arrives at `step`.
pub fn screen(step: Step) -> Screen {
    match step {
        Step::Welcome => Screen::with_buttons(
            WELCOME_TEXT,
            vec![
                Button::new("Как можно поучаствовать?", HOW_TO_PARTICIPATE),
                Button::new("А что в программе?", SHOW_PROGRAM),
            ],
        ),
        Step::ProgramInfo => Screen::with_buttons(
            PROGRAM_TEXT,
            vec![Button::new("Как можно поучаствовать?", HOW_TO_PARTICIPATE)],
        ),
        Step::PackageSelection => Screen::with_buttons(
            PACKAGES_TEXT,
            Package::ALL
                .iter()
                .map(|p| Button::new(p.button_label(), p.id()))
                .collect(),
        ),
        Step::FirstName => Screen::text_only(FIRST_NAME_TEXT),
        Step::LastName => Screen::text_only(LAST_NAME_TEXT),
        Step::ParticipatedBefore => Screen::with_buttons(PARTICIPATED_TEXT, yes_no()),
        Step::ParticipationYear => Screen::text_only(PARTICIPATION_YEAR_TEXT),
        Step::IsGraduate => Screen::with_buttons(GRADUATE_TEXT, yes_no()),
        Step::GraduationYear => Screen::text_only(GRADUATION_YEAR_TEXT),
        Step::Completed => Screen::text_only(COMPLETION_TEXT),
    }
}
