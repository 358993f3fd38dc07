//! Sidebar Component
//!
//! Collapsible navigation tree. Collapse requests go up through `on_toggle`;
//! the per-entry expansion flags stay local.

use leptos::*;
use leptos_router::*;
use spendbook::nav::{NavItem, Sidebar as SidebarState};

/// Left sidebar navigation
#[component]
pub fn Sidebar(
    #[prop(into)] is_collapsed: Signal<bool>,
    on_toggle: Callback<bool>,
) -> impl IntoView {
    let sidebar = create_rw_signal(SidebarState::default());

    let toggle_collapse = move |_| {
        let next = sidebar
            .try_update(|s| s.toggle_collapse(is_collapsed.get_untracked()))
            .unwrap_or(true);
        on_toggle.call(next);
    };
    let close = move |_| {
        let next = sidebar.with_untracked(SidebarState::close);
        on_toggle.call(next);
    };

    view! {
        <aside class=move || {
            if is_collapsed.get() {
                "fixed inset-y-0 left-0 w-16 bg-gray-800 border-r border-gray-700 transition-all"
            } else {
                "fixed inset-y-0 left-0 w-64 bg-gray-800 border-r border-gray-700 transition-all"
            }
        }>
            <div class="flex items-center justify-between h-16 px-4">
                <button class="text-xl" title="Toggle sidebar" on:click=toggle_collapse>
                    <i class="bi bi-list" />
                </button>
                <Show when=move || !is_collapsed.get()>
                    <A href="/expenses" class="text-xl font-bold text-white">"Spendbook"</A>
                    <button class="md:hidden text-gray-400" title="Close" on:click=close>
                        <i class="bi bi-x-lg" />
                    </button>
                </Show>
            </div>

            <nav class="mt-4 space-y-1">
                {move || {
                    sidebar
                        .with(|s| s.entries().to_vec())
                        .into_iter()
                        .enumerate()
                        .map(|(index, entry)| {
                            let item = entry.item;
                            let expanded = entry.expanded;
                            view! {
                                <div>
                                    <div class="flex items-center">
                                        <NavLink item=item collapsed=is_collapsed />
                                        <Show when=move || item.has_children() && !is_collapsed.get()>
                                            <button
                                                class="px-2 text-gray-400"
                                                on:click=move |_| sidebar.update(|s| s.toggle_expand(index))
                                            >
                                                <i class=if expanded { "bi bi-chevron-up" } else { "bi bi-chevron-down" } />
                                            </button>
                                        </Show>
                                    </div>
                                    <Show when=move || expanded && !is_collapsed.get()>
                                        <div class="ml-6 space-y-1">
                                            {item
                                                .children
                                                .iter()
                                                .map(|child| view! { <NavLink item=*child collapsed=is_collapsed /> })
                                                .collect_view()}
                                        </div>
                                    </Show>
                                </div>
                            }
                        })
                        .collect_view()
                }}
            </nav>
        </aside>
    }
}

/// Individual navigation link
#[component]
fn NavLink(item: NavItem, collapsed: Signal<bool>) -> impl IntoView {
    let href = item.route.unwrap_or("#");
    let icon = item.icon.unwrap_or("bi bi-dot");

    view! {
        <A
            href=href
            class="flex-1 flex items-center space-x-3 px-4 py-2 rounded-lg text-gray-300 hover:text-white hover:bg-gray-700 transition-colors"
            active_class="bg-gray-700 text-white"
        >
            <i class=icon />
            <Show when=move || !collapsed.get()>
                <span>{item.label}</span>
            </Show>
        </A>
    }
}
