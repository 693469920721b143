use std::{cell::RefCell, rc::Rc};

use gtk4::{
    self as gtk, Align, Application, ApplicationWindow, Button, DropDown,
    Label, Orientation, PolicyType, ScrolledWindow, prelude::*,
};

use crate::{
    console::{Console, ConsoleState},
    model::{DemoUser, EventType},
    view::{self, Listing, Row},
};

const WIDTH: i32 = 720;
const HEIGHT: i32 = 640;

/// The two-panel console window: the trigger form and the notification list.
pub struct ConsoleWindow {
    pub window: ApplicationWindow,
    target: Label,
    list: gtk::Box,
}

impl ConsoleWindow {
    pub fn build(
        application: &Application,
        console: &Rc<RefCell<Console>>,
    ) -> Rc<Self> {
        let title = Label::builder()
            .css_classes(["title"])
            .halign(Align::Center)
            .build();
        title.set_text(view::TITLE);

        let target = Label::builder().css_classes(["target"]).build();
        let list = gtk::Box::builder()
            .orientation(Orientation::Vertical)
            .spacing(12)
            .build();

        let (form, controls) = Self::form(&console.borrow());
        let notifications = Self::notifications_panel(&target, &list);

        let container = gtk::Box::builder()
            .orientation(Orientation::Vertical)
            .spacing(24)
            .margin_top(24)
            .margin_bottom(24)
            .margin_start(24)
            .margin_end(24)
            .build();
        container.append(&title);
        container.append(&form);
        container.append(&notifications);

        let scrolled = ScrolledWindow::builder()
            .hscrollbar_policy(PolicyType::Never)
            .child(&container)
            .build();

        let window = ApplicationWindow::builder()
            .application(application)
            .title("Insyd Notification POC")
            .css_classes(["console"])
            .default_width(WIDTH)
            .default_height(HEIGHT)
            .child(&scrolled)
            .build();

        let this = Rc::new(Self { window, target, list });
        this.render(console.borrow().state());
        this.connect(console, controls);
        this
    }

    /// Brings every widget that depends on `state` up to date.
    pub fn render(&self, state: &ConsoleState) {
        self.target.set_text(state.target.id());
        self.render_list(state);
    }

    pub fn render_list(&self, state: &ConsoleState) {
        while let Some(child) = self.list.first_child() {
            self.list.remove(&child);
        }

        match view::listing(state.notifications()) {
            Listing::Empty(placeholder) => {
                let label = Label::builder()
                    .css_classes(["placeholder"])
                    .halign(Align::Start)
                    .build();
                label.set_text(placeholder);
                self.list.append(&label);
            }
            Listing::Items(rows) => {
                for row in &rows {
                    self.list.append(&Self::row(row));
                }
            }
        }
    }

    // Widget closures hold the window weakly, the window owns the widgets.
    fn connect(
        self: &Rc<Self>,
        console: &Rc<RefCell<Console>>,
        controls: Controls,
    ) {
        {
            let console = console.clone();
            controls.event_type.connect_selected_notify(move |dropdown| {
                if let Some(&event_type) =
                    EventType::ALL.get(dropdown.selected() as usize)
                {
                    console.borrow_mut().select_event_type(event_type);
                }
            });
        }

        {
            let console = console.clone();
            controls.source.connect_selected_notify(move |dropdown| {
                if let Some(&user) =
                    DemoUser::ALL.get(dropdown.selected() as usize)
                {
                    console.borrow_mut().select_source_user(user);
                }
            });
        }

        {
            let console = console.clone();
            let this = Rc::downgrade(self);
            controls.target.connect_selected_notify(move |dropdown| {
                let Some(&user) =
                    DemoUser::ALL.get(dropdown.selected() as usize)
                else {
                    return;
                };

                let mut console = console.borrow_mut();
                console.select_target_user(user);
                if let Some(this) = this.upgrade() {
                    this.render(console.state());
                }
            });
        }

        {
            let console = console.clone();
            controls.submit.connect_clicked(move |_button| {
                console.borrow().submit_event();
            });
        }

        {
            let console = console.clone();
            self.window.connect_close_request(move |_window| {
                console.borrow_mut().shutdown();
                gtk::glib::Propagation::Proceed
            });
        }
    }

    fn form(console: &Console) -> (gtk::Box, Controls) {
        let state = console.state();

        let event_labels: Vec<_> =
            EventType::ALL.iter().map(|kind| kind.label()).collect();
        let user_labels: Vec<_> =
            DemoUser::ALL.iter().map(|user| user.display_name()).collect();

        let event_type = DropDown::from_strings(&event_labels);
        event_type.set_selected(position(&EventType::ALL, &state.event_type));
        let source = DropDown::from_strings(&user_labels);
        source.set_selected(position(&DemoUser::ALL, &state.source));
        let target = DropDown::from_strings(&user_labels);
        target.set_selected(position(&DemoUser::ALL, &state.target));

        let fields = gtk::Box::builder()
            .orientation(Orientation::Horizontal)
            .spacing(16)
            .homogeneous(true)
            .build();
        fields.append(&Self::field("Event Type", &event_type));
        fields.append(&Self::field("Source User", &source));
        fields.append(&Self::field("Target User", &target));

        let submit = Button::builder()
            .label("Trigger Event")
            .css_classes(["trigger"])
            .halign(Align::Center)
            .build();

        let panel = Self::panel("Trigger Event");
        panel.append(&fields);
        panel.append(&submit);

        (panel, Controls { event_type, source, target, submit })
    }

    fn notifications_panel(target: &Label, list: &gtk::Box) -> gtk::Box {
        let prefix = Label::builder().css_classes(["panel-heading"]).build();
        prefix.set_text("Notifications for");
        target.add_css_class("panel-heading");

        let heading = gtk::Box::builder()
            .orientation(Orientation::Horizontal)
            .spacing(6)
            .build();
        heading.append(&prefix);
        heading.append(target);

        let panel = gtk::Box::builder()
            .orientation(Orientation::Vertical)
            .spacing(16)
            .css_classes(["panel"])
            .build();
        panel.append(&heading);
        panel.append(list);
        panel
    }

    fn panel(heading: &str) -> gtk::Box {
        let label = Label::builder()
            .css_classes(["panel-heading"])
            .halign(Align::Start)
            .build();
        label.set_text(heading);

        let panel = gtk::Box::builder()
            .orientation(Orientation::Vertical)
            .spacing(16)
            .css_classes(["panel"])
            .build();
        panel.append(&label);
        panel
    }

    fn field(text: &str, dropdown: &DropDown) -> gtk::Box {
        let label = Label::builder()
            .css_classes(["field-label"])
            .halign(Align::Start)
            .build();
        label.set_text(text);

        let field = gtk::Box::builder()
            .orientation(Orientation::Vertical)
            .spacing(12)
            .build();
        field.append(&label);
        field.append(dropdown);
        field
    }

    fn row(row: &Row) -> gtk::Box {
        // *-----------------------*
        // | Type: KIND            |
        // | Content: CONTENT      |
        // | ⏰ TIMESTAMP          |
        // *-----------------------*
        let container = gtk::Box::builder()
            .orientation(Orientation::Vertical)
            .css_classes(["notification"])
            .name(row.key.as_str())
            .build();

        container.append(&Self::labelled("Type:", &row.kind));
        container.append(&Self::labelled("Content:", &row.content));

        let time = Label::builder()
            .css_classes(["time"])
            .halign(Align::Start)
            .build();
        time.set_text(&format!("⏰ {}", row.timestamp));
        container.append(&time);

        container
    }

    fn labelled(name: &str, value: &str) -> Label {
        let label = Label::builder()
            .css_classes(["field"])
            .halign(Align::Start)
            .wrap(true)
            .build();
        label.set_markup(&format!(
            "<b>{}</b> {}",
            gtk::glib::markup_escape_text(name),
            gtk::glib::markup_escape_text(value)
        ));
        label
    }
}

struct Controls {
    event_type: DropDown,
    source: DropDown,
    target: DropDown,
    submit: Button,
}

fn position<T: PartialEq>(options: &[T], value: &T) -> u32 {
    options
        .iter()
        .position(|option| option == value)
        .unwrap_or_default() as u32
}
