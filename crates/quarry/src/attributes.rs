//! Attributes, classes and inline style

use crate::selection::Selection;

/// Declarations of a `style` attribute as `(property, value)` pairs
fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

fn property_name(name: &str) -> String {
    name.trim().replace('_', "-")
}

impl Selection {
    /// Attribute of the first element
    pub fn attr(&self, name: &str) -> Option<String> {
        self.first()?.attr(name)
    }

    pub fn set_attr(&self, name: &str, value: &str) -> &Self {
        self.set_attrs(&[(name, value)])
    }

    pub fn set_attrs(&self, attrs: &[(&str, &str)]) -> &Self {
        for node in self.iter() {
            let mut tree = node.document().borrow_mut();
            if let Some(el) = tree.element_mut(node.id()) {
                for &(name, value) in attrs {
                    el.set_attribute(name, value);
                }
            }
        }
        self
    }

    pub fn remove_attr(&self, name: &str) -> &Self {
        for node in self.iter() {
            if let Some(el) = node.document().borrow_mut().element_mut(node.id()) {
                el.remove_attribute(name);
            }
        }
        self
    }

    /// Whether any element carries `class`
    pub fn has_class(&self, class: &str) -> bool {
        self.iter().any(|node| {
            node.document()
                .borrow()
                .element(node.id())
                .map(|el| el.has_class(class))
                .unwrap_or(false)
        })
    }

    /// Rewrite the class list of every element with `edit`
    ///
    /// An element whose list ends up empty loses the attribute.
    fn edit_classes(&self, mut edit: impl FnMut(&mut Vec<String>)) -> &Self {
        for node in self.iter() {
            let mut tree = node.document().borrow_mut();
            let Some(el) = tree.element_mut(node.id()) else {
                continue;
            };
            let mut classes: Vec<String> = el.classes().into_iter().map(str::to_string).collect();
            let before = classes.clone();
            edit(&mut classes);
            if classes == before {
                continue;
            }
            if classes.is_empty() {
                el.remove_attribute("class");
            } else {
                el.set_attribute("class", classes.join(" "));
            }
        }
        self
    }

    /// Add every space separated class in `value`
    pub fn add_class(&self, value: &str) -> &Self {
        self.edit_classes(|classes| {
            for class in value.split_whitespace() {
                if !classes.iter().any(|c| c == class) {
                    classes.push(class.to_string());
                }
            }
        })
    }

    pub fn remove_class(&self, value: &str) -> &Self {
        let removed: Vec<&str> = value.split_whitespace().collect();
        self.edit_classes(|classes| classes.retain(|c| !removed.contains(&c.as_str())))
    }

    pub fn toggle_class(&self, value: &str) -> &Self {
        self.edit_classes(|classes| {
            for class in value.split_whitespace() {
                match classes.iter().position(|c| c == class) {
                    Some(i) => {
                        classes.remove(i);
                    }
                    None => classes.push(class.to_string()),
                }
            }
        })
    }

    /// Inline style property of the first element
    pub fn css(&self, name: &str) -> Option<String> {
        let name = property_name(name);
        let style = self.attr("style")?;
        parse_style(&style)
            .into_iter()
            .find(|(prop, _)| *prop == name)
            .map(|(_, value)| value)
    }

    pub fn set_css(&self, name: &str, value: &str) -> &Self {
        self.set_css_bulk(&[(name, value)])
    }

    /// Set several style properties; `_` in a name stands for `-`
    ///
    /// Properties being set move to the end of the declaration list.
    pub fn set_css_bulk(&self, properties: &[(&str, &str)]) -> &Self {
        let names: Vec<String> = properties.iter().map(|(n, _)| property_name(n)).collect();
        for node in self.iter() {
            let mut tree = node.document().borrow_mut();
            let Some(el) = tree.element_mut(node.id()) else {
                continue;
            };
            let mut declarations: Vec<String> = parse_style(el.get_attribute("style").unwrap_or(""))
                .into_iter()
                .filter(|(prop, _)| !names.contains(prop))
                .map(|(prop, value)| format!("{}: {}", prop, value))
                .collect();
            for (name, (_, value)) in names.iter().zip(properties) {
                declarations.push(format!("{}: {}", name, value));
            }
            el.set_attribute("style", declarations.join("; "));
        }
        self
    }

    pub fn hide(&self) -> &Self {
        self.set_css("display", "none")
    }

    pub fn show(&self) -> &Self {
        self.set_css("display", "block")
    }

    pub fn height(&self) -> Option<String> {
        self.attr("height")
    }

    pub fn set_height(&self, value: &str) -> &Self {
        self.set_attr("height", value)
    }

    pub fn width(&self) -> Option<String> {
        self.attr("width")
    }

    pub fn set_width(&self, value: &str) -> &Self {
        self.set_attr("width", value)
    }
}

#[cfg(test)]
mod tests {
    use crate::Quarry;

    #[test]
    fn test_attr_roundtrip() {
        let d = Quarry::new().parse("<div><a href=\"x\">a</a><a>b</a></div>").unwrap();
        let a = d.query("a").unwrap();
        assert_eq!(a.attr("href").as_deref(), Some("x"));
        a.set_attrs(&[("href", "y"), ("rel", "nofollow")]);
        assert_eq!(d.to_string(), "<div><a href=\"y\" rel=\"nofollow\">a</a><a href=\"y\" rel=\"nofollow\">b</a></div>");
        a.remove_attr("rel").remove_attr("missing");
        assert_eq!(a.eq(1).attr("rel"), None);
        assert_eq!(d.query("span").unwrap().attr("href"), None);
    }

    #[test]
    fn test_classes() {
        let d = Quarry::new().parse("<div><p class=\"a\">1</p><p>2</p></div>").unwrap();
        let p = d.query("p").unwrap();
        assert!(p.has_class("a"));
        assert!(!p.has_class("b"));

        p.add_class("b a");
        assert_eq!(p.eq(0).attr("class").as_deref(), Some("a b"));
        assert_eq!(p.eq(1).attr("class").as_deref(), Some("b a"));

        p.remove_class("a");
        assert_eq!(p.eq(0).attr("class").as_deref(), Some("b"));
        p.remove_class("b");
        assert_eq!(p.eq(0).attr("class"), None);

        p.toggle_class("c");
        assert!(p.eq(1).has_class("c"));
        p.toggle_class("c");
        assert!(!p.has_class("c"));
        assert_eq!(d.to_string(), "<div><p>1</p><p>2</p></div>");
    }

    #[test]
    fn test_remove_missing_class_adds_nothing() {
        let d = Quarry::new().parse("<p>x</p>").unwrap();
        d.remove_class("nope");
        assert_eq!(d.to_string(), "<p>x</p>");
    }

    #[test]
    fn test_css() {
        let d = Quarry::new().parse("<p style=\"color: red;font-size:2em\">x</p>").unwrap();
        assert_eq!(d.css("font_size").as_deref(), Some("2em"));
        d.set_css("color", "blue");
        assert_eq!(d.attr("style").as_deref(), Some("font-size: 2em; color: blue"));
        d.set_css_bulk(&[("background_color", "white"), ("font-size", "1em")]);
        assert_eq!(
            d.attr("style").as_deref(),
            Some("color: blue; background-color: white; font-size: 1em")
        );
        d.hide();
        assert_eq!(d.css("display").as_deref(), Some("none"));
        d.show();
        assert_eq!(d.css("display").as_deref(), Some("block"));
        assert_eq!(d.css("margin"), None);
    }

    #[test]
    fn test_dimensions() {
        let d = Quarry::new().parse("<img width=\"10\"/>").unwrap();
        assert_eq!(d.width().as_deref(), Some("10"));
        assert_eq!(d.height(), None);
        d.set_height("20").set_width("30");
        assert_eq!(d.to_string(), "<img width=\"30\" height=\"20\"/>");
    }
}
