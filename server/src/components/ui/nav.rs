use maud::{html, Markup, Render};

use super::avatar::Avatar;
use crate::accounts::Account;

/// The site navigation bar. Shows account actions when someone is logged in.
pub struct NavBar {
    pub account: Option<Account>,
    pub is_super_user: bool,
}

impl NavBar {
    pub fn new(account: Option<Account>, is_super_user: bool) -> Self {
        Self {
            account,
            is_super_user,
        }
    }
}

fn nav_link(text: &str, href: &str) -> Markup {
    html! {
        a href=(href) class="px-3 py-2 text-sm font-medium text-gray-600 hover:text-indigo-700" { (text) }
    }
}

impl Render for NavBar {
    fn render(&self) -> Markup {
        html! {
            nav class="bg-white border-b border-gray-200" {
                div class="max-w-5xl mx-auto px-4 flex flex-wrap items-center justify-between gap-2 py-2" {
                    div class="flex flex-wrap items-center gap-1" {
                        a href="/" class="mr-4 text-xl font-bold text-indigo-700" { "Quill" }
                        (nav_link("Blog", "/posts"))
                        (nav_link("Name", "/name"))
                        @if self.account.is_some() {
                            (nav_link("Add Post", "/add_post"))
                        }
                    }

                    form action="/search" method="post" class="flex items-center gap-2" {
                        input type="search" name="searched" placeholder="Search posts"
                            class="px-3 py-1.5 border border-gray-300 rounded-lg text-sm" {}
                        button type="submit" class="px-3 py-1.5 text-sm rounded-lg bg-indigo-600 text-white" { "Search" }
                    }

                    @if let Some(account) = &self.account {
                        // CSS-only dropdown using the details/summary elements
                        details class="relative inline-block text-left" {
                            summary class="flex items-center gap-2 cursor-pointer list-none" {
                                (Avatar::for_account(account).size("w-8 h-8"))
                                span class="text-sm font-medium text-gray-700" { (account.username) }
                            }

                            div class="absolute right-0 mt-2 w-48 rounded-md shadow-lg bg-white ring-1 ring-black ring-opacity-5 z-10 py-1" {
                                a href="/dashboard" class="block px-4 py-2 text-sm hover:bg-gray-100" { "Dashboard" }
                                @if self.is_super_user {
                                    a href="/admin" class="block px-4 py-2 text-sm hover:bg-gray-100" { "Admin" }
                                }
                                a href="/logout" class="block px-4 py-2 text-sm hover:bg-gray-100" { "Logout" }
                            }
                        }
                    } @else {
                        div class="flex items-center gap-1" {
                            (nav_link("Login", "/login"))
                            (nav_link("Register", "/user/add"))
                        }
                    }
                }
            }
        }
    }
}
