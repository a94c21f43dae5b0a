use scraper::{node::Node, ElementRef, Html, Selector};

/// The one string an element stands for, if it has exactly one.
///
/// An element with a single text child yields that text. An element with a
/// single child element yields that child's single string, recursively.
/// Anything else, including an empty element, yields `None`.
///
/// ```text
/// <div>Previous close</div>               -> Some("Previous close")
/// <div><span>$1.00</span></div>           -> Some("$1.00")
/// <div><span>a</span><span>b</span></div> -> None
/// ```
pub fn single_string<'a>(element: &ElementRef<'a>) -> Option<&'a str> {
    let mut children = element.children();
    let only = children.next()?;
    if children.next().is_some() {
        return None;
    }

    match only.value() {
        Node::Text(text) => Some(&**text),
        Node::Element(_) => ElementRef::wrap(only).and_then(|child| single_string(&child)),
        _ => None,
    }
}

/// Nearest ancestor of `element` with tag `name`.
pub fn find_parent<'a>(element: &ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == name)
}

/// First element in `document` (document order) matching `css_selector` and
/// accepted by `predicate`.
pub fn find_in_document<'a, P>(
    document: &'a Html,
    css_selector: &str,
    mut predicate: P,
) -> Option<ElementRef<'a>>
where
    P: FnMut(&ElementRef<'a>) -> bool,
{
    let selector = Selector::parse(css_selector).ok()?;
    document.select(&selector).find(|e| predicate(e))
}

/// First descendant of `element` (document order, `element` itself excluded)
/// matching `css_selector` and accepted by `predicate`.
pub fn find_descendant<'a, P>(
    element: &ElementRef<'a>,
    css_selector: &str,
    mut predicate: P,
) -> Option<ElementRef<'a>>
where
    P: FnMut(&ElementRef<'a>) -> bool,
{
    let selector = Selector::parse(css_selector).ok()?;
    element.select(&selector).find(|e| predicate(e))
}
