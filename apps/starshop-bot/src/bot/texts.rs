//! User-facing copy.

pub const REGION_REFUSAL: &str = "⛔ Sorry, we do not serve users from this region.";
pub const JOIN_CHANNEL: &str = "📢 Please join our channel first to use the bot:";
pub const SUBSCRIPTION_CONFIRMED: &str = "✅ Thanks for joining! Send /start to continue.";
pub const ASK_PHONE: &str = "📱 Please share your phone number to continue:";
pub const SHARE_PHONE_BUTTON: &str = "Share phone number";
pub const FOREIGN_CONTACT: &str = "❗ Please share your own phone number using the button below.";
pub const VERIFIED: &str = "✅ Verification complete! You can now use the bot.";
pub const WRONG_EMOJI: &str = "❌ That is not the right emoji. Please try again.";
pub const ALREADY_VERIFIED: &str = "✅ Your account is already verified.";
pub const REGISTER_FIRST: &str = "❗ Please complete registration first by sending /start";
pub const VERIFY_FIRST: &str = "❗ Please finish verification first by sending /start";
pub const INVITE_REGISTERED: &str =
    "🎉 You joined through an invite link! Send /start to finish verification.";
pub const INSUFFICIENT_STARS: &str =
    "❌ You do not have enough stars. Earn more through the referral program.";
pub const INVALID_AMOUNT: &str = "❌ Please enter a positive whole number of stars.";
/// The reply to this prompt is recognised by the marker below in the replied-to text.
pub const CUSTOM_AMOUNT_PROMPT: &str =
    "📝 Please enter the number of stars you want to buy (for example 55 or 66):";
pub const CUSTOM_AMOUNT_MARKER: &str = "number of stars you want to buy";
pub const WELCOME: &str = "Welcome to Panda Store 🐼\nYou can buy Telegram stars from our official website 🚀\nSend /invite to start earning with the bot";
pub const HELP: &str = "You can reach the site manager here:";
pub const DASHBOARD: &str = "Order list:";
pub const OPEN: &str = "✅ You can place your order on the website now:";
pub const SHOWCASE_WARNING: &str = "⚠️ Orders placed from the showcase do not reach us ⚠️";
pub const CONFIRM_COMPLETION: &str = "Are you sure this order has been fulfilled❓";
pub const ORDER_COMPLETED: &str = "🎉 Order status updated successfully 🎉";
pub const ORDER_ALREADY_COMPLETED: &str = "ℹ️ This order was already marked as completed.";
pub const ORDER_NOT_FOUND: &str = "❌ Order not found.";
pub const CANCELLED: &str = "❌ Operation cancelled";
pub const ALREADY_COMPLETED_TOAST: &str = "This order is already completed";
pub const STARS_CONFIRMED: &str = "✅ Fulfilment recorded.";
pub const SHARE_INVITE_TEXT: &str = "Join the Telegram stars shop bot!";
pub const TEMPORARY_FAILURE: &str = "⚠️ Something went wrong, please try again in a moment.";

pub fn challenge(candidates: &[String], after_contact: bool) -> String {
    let lead = if after_contact {
        "🔐 Thanks for sharing your phone number. To verify, pick the emoji below from these options:"
    } else {
        "🔐 To verify, pick the emoji below from these options:"
    };
    format!("{lead}\n\n{}", candidates.join(" "))
}

pub fn closed(open_hour: u32, close_hour: u32) -> String {
    format!(
        "❌ Sorry, we are outside working hours right now.\n🕘 Working hours: {} until {}.\n🔁 Please try again during working hours.",
        clock_hour(open_hour),
        clock_hour(close_hour)
    )
}

fn clock_hour(hour: u32) -> String {
    match hour % 24 {
        0 => "midnight".to_string(),
        12 => "noon".to_string(),
        h @ 1..=11 => format!("{h} AM"),
        h => format!("{} PM", h - 12),
    }
}

pub fn invite(link: &str, invitees: i64, balance: i64) -> String {
    format!("📣 Your invite link:\n{link}\n\n🔢 Referrals: {invitees}\n⭐ Stars earned: {balance}")
}

pub fn shop(balance: i64) -> String {
    format!("🛒 Stars shop\n\n⭐ Available stars: {balance}\n\nChoose how many stars to buy:")
}

pub fn purchase_received(amount: i64, remaining: i64) -> String {
    format!(
        "✅ Your request for {amount} stars was received. You will be notified once it is fulfilled.\n⭐ Remaining stars: {remaining}"
    )
}

pub fn purchase_for_operators(username: Option<&str>, user_id: i64, amount: i64) -> String {
    format!(
        "🛒 New stars purchase\n👤 User: @{}\n⭐ Stars: {amount}\n🆔 ID: {user_id}",
        username.unwrap_or("unknown")
    )
}

pub fn purchase_fulfilled(amount: i64) -> String {
    format!("🎉 Your order for {amount} stars has been fulfilled!")
}

pub fn new_order(username: &str, stars: i64, ton: &str, usd: &str, date: &str) -> String {
    format!(
        "New Order 🛒\n👤 Username: @{username}\n⭐️ Stars: {stars}\n💰 TON: {ton} TON\n💵 USDT: {usd} USDT\n📅 Order Date: {date}"
    )
}
