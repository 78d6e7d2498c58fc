use crate::silent_logs;
use agora::{
    BlockedUser, Comment, Connection, Engine, Error, FlaggedAccount, Following, Like, Message,
    Notification, Post, RequestContext, User,
};
use time::macros::datetime;

async fn create_user<C: Connection>(engine: &Engine<C>, username: &str) -> User {
    let mut user = User::new(username, format!("{username}@example.com"));
    user.user_password = "$argon2id$placeholder".into();
    user.salt = b"salt".to_vec();
    engine
        .insert(&RequestContext::new(), &user)
        .await
        .expect("Could not create the user");
    user
}

pub async fn users<C: Connection>(engine: &Engine<C>) {
    let ctx = RequestContext::new().with_trace_id("records-users");
    let mut users = Vec::new();
    for (i, name) in ["Anneliese", "bartholomew", "Cornelius"].into_iter().enumerate() {
        let mut user = User::new(name, format!("{}@Agora.example", name.to_lowercase()));
        user.created_at = datetime!(2024-03-01 09:00:00 UTC) + time::Duration::days(i as i64);
        user.updated_at = user.created_at;
        user.salt = vec![i as u8; 4];
        user.user_bio = (i == 1).then(|| "Collects maps".into());
        users.push(user);
    }
    engine
        .batch_write(&ctx, "users", &users)
        .await
        .expect("Could not write the users");

    // Round trip of every column
    let found = User::find(engine, &ctx, &users[1].user_id)
        .await
        .expect("Could not find the user");
    assert_eq!(found, users[1]);
    let found = User::find_by_username(engine, &ctx, "Cornelius")
        .await
        .expect("Could not find the user by username");
    assert_eq!(found.user_id, users[2].user_id);
    let result = User::find(engine, &ctx, "nobody").await;
    assert!(matches!(result, Err(Error::NotFound(..))), "{result:?}");

    // Existence checks
    assert!(User::username_exists(engine, &ctx, "Anneliese").await.unwrap());
    assert!(!User::username_exists(engine, &ctx, "anneliese_2").await.unwrap());
    assert_eq!(
        User::username_and_email_exist(engine, &ctx, "Someone", "cornelius@Agora.example")
            .await
            .unwrap(),
        (false, true)
    );

    // Listing, newest first
    let page = User::list(engine, &ctx, 2, 0).await.expect("Could not list the users");
    let names = page.iter().map(|v| v.username.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["Cornelius", "bartholomew"]);
    let page = User::list(engine, &ctx, 2, 2).await.expect("Could not list the users");
    assert!(page.iter().any(|v| v.username == "Anneliese"));

    // Case insensitive search on username and e-mail
    let found = User::search(engine, &ctx, "CORN").await.expect("Could not search");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].username, "Cornelius");
    let found = User::search(engine, &ctx, "agora.EXAMPLE").await.expect("Could not search");
    assert_eq!(found.len(), 3);

    // Save
    let mut user = users[0].clone();
    user.user_bio = Some("Plays the cello".into());
    user.rank = 4;
    user.save(engine, &ctx).await.expect("Could not save the user");
    assert!(user.updated_at > users[0].updated_at);
    let found = User::find(engine, &ctx, &user.user_id).await.unwrap();
    assert_eq!(found.user_bio.as_deref(), Some("Plays the cello"));
    assert_eq!(found.rank, 4);

    // Delete
    let affected = User::delete(engine, &ctx, &user.user_id)
        .await
        .expect("Could not delete the user");
    assert_eq!(affected.rows_affected, 1);
    assert!(!User::username_exists(engine, &ctx, "Anneliese").await.unwrap());
}

pub async fn posts<C: Connection>(engine: &Engine<C>) {
    let ctx = RequestContext::new().with_trace_id("records-posts");
    let author = create_user(engine, "post_author").await;
    let reader = create_user(engine, "post_reader").await;

    let mut first = Post::new(&author.user_id, "First light over the harbour");
    first.created_at = datetime!(2024-05-01 06:30:00 UTC);
    first.location_name = "Harbour".into();
    first.latitude = 44.41;
    first.longitude = 8.93;
    first
        .publish(engine, &ctx, &["sunrise", "harbour"])
        .await
        .expect("Could not publish the first post");
    let mut second = Post::new(&author.user_id, "Fog");
    second.created_at = datetime!(2024-05-02 06:30:00 UTC);
    second.caption = Some("No view today".into());
    second
        .publish(engine, &ctx, &[])
        .await
        .expect("Could not publish the second post");

    let found = Post::find(engine, &ctx, &first.post_id)
        .await
        .expect("Could not find the post");
    assert_eq!(found, first);
    let tags = found.tags(engine, &ctx).await.expect("Could not read the tags");
    assert_eq!(
        tags.iter().map(|v| v.tag_id.as_str()).collect::<Vec<_>>(),
        ["harbour", "sunrise"]
    );
    let list = Post::list_by_user(engine, &ctx, &author.user_id)
        .await
        .expect("Could not list the posts");
    assert_eq!(
        list.iter().map(|v| v.post_id.as_str()).collect::<Vec<_>>(),
        [second.post_id.as_str(), first.post_id.as_str()]
    );

    // A duplicate tag aborts the whole publication
    let third = Post::new(&author.user_id, "Twice");
    let result = silent_logs! { third.publish(engine, &ctx, &["same", "same"]).await };
    assert!(matches!(result, Err(Error::Batch { index: 1, .. })), "{result:?}");
    let result = Post::find(engine, &ctx, &third.post_id).await;
    assert!(matches!(result, Err(Error::NotFound(..))), "{result:?}");

    // Likes and comments
    let mut like = Like::new(&reader.user_id, &first.post_id);
    like.created_at = datetime!(2024-05-01 07:00:00 UTC);
    engine.insert(&ctx, &like).await.expect("Could not like");
    let mut own = Like::new(&author.user_id, &first.post_id);
    own.created_at = datetime!(2024-05-01 08:00:00 UTC);
    engine.insert(&ctx, &own).await.expect("Could not like");
    let likes = Like::list_for_post(engine, &ctx, &first.post_id).await.unwrap();
    assert_eq!(likes, [own.clone(), like.clone()]);
    let likes = Like::list_by_user(engine, &ctx, &reader.user_id).await.unwrap();
    assert_eq!(likes, [like]);

    let mut comment = Comment::new(&reader.user_id, &first.post_id, "Beautiful");
    comment.created_at = datetime!(2024-05-01 07:05:00 UTC);
    let mut reply = Comment::new(&author.user_id, &first.post_id, "Thanks!");
    reply.created_at = datetime!(2024-05-01 07:10:00 UTC);
    engine
        .batch_write(&ctx, "comments", [&comment, &reply])
        .await
        .expect("Could not comment");
    let comments = Comment::list_for_post(engine, &ctx, &first.post_id).await.unwrap();
    assert_eq!(comments, [reply, comment]);

    // Delete
    let affected = Post::delete(engine, &ctx, &second.post_id).await.unwrap();
    assert_eq!(affected.rows_affected, 1);
    assert_eq!(
        Post::list_by_user(engine, &ctx, &author.user_id).await.unwrap().len(),
        1
    );
}

pub async fn social<C: Connection>(engine: &Engine<C>) {
    let ctx = RequestContext::new().with_trace_id("records-social");
    let alice = create_user(engine, "social_alice").await;
    let bruno = create_user(engine, "social_bruno").await;
    let carla = create_user(engine, "social_carla").await;

    // Messages in both directions, newest first
    let mut messages = Vec::new();
    for (i, (from, to, text)) in [
        (&alice, &bruno, "Ciao"),
        (&bruno, &alice, "Hey!"),
        (&alice, &carla, "Unrelated"),
        (&alice, &bruno, "Dinner tonight?"),
    ]
    .into_iter()
    .enumerate()
    {
        let mut message = Message::text(&from.user_id, &to.user_id, text);
        message.timestamp = datetime!(2024-06-10 19:00:00 UTC) + time::Duration::minutes(i as i64);
        messages.push(message);
    }
    engine
        .batch_write(&ctx, "messages", &messages)
        .await
        .expect("Could not send the messages");
    let conversation = Message::list_between(engine, &ctx, &bruno.user_id, &alice.user_id)
        .await
        .expect("Could not read the conversation");
    assert_eq!(
        conversation
            .iter()
            .map(|v| v.content.as_deref().unwrap_or_default())
            .collect::<Vec<_>>(),
        ["Dinner tonight?", "Hey!", "Ciao"]
    );
    assert!(conversation.iter().all(|v| !v.is_read && v.media_url.is_none()));

    // Notifications
    let notification = Notification::new(&alice.user_id, "follow", "social_bruno followed you");
    engine.insert(&ctx, &notification).await.unwrap();
    let list = Notification::list_for_user(engine, &ctx, &alice.user_id).await.unwrap();
    assert_eq!(list, [notification.clone()]);
    assert_eq!(list[0].kind, "follow");
    Notification::mark_as_read(engine, &ctx, &notification.notification_id)
        .await
        .expect("Could not mark the notification as read");
    let list = Notification::list_for_user(engine, &ctx, &alice.user_id).await.unwrap();
    assert!(list[0].is_read);
    let result = Notification::mark_as_read(engine, &ctx, "missing").await;
    assert!(matches!(result, Err(Error::NotFound(..))), "{result:?}");
}

pub async fn relations<C: Connection>(engine: &Engine<C>) {
    let ctx = RequestContext::new().with_trace_id("records-relations");
    let dario = create_user(engine, "graph_dario").await;
    let elena = create_user(engine, "graph_elena").await;
    let fabio = create_user(engine, "graph_fabio").await;

    // Followings
    engine
        .batch_write(
            &ctx,
            "followings",
            &[
                Following::new(&elena.user_id, &dario.user_id),
                Following::new(&fabio.user_id, &dario.user_id),
                Following::new(&dario.user_id, &elena.user_id),
            ],
        )
        .await
        .expect("Could not follow");
    let followers = Following::list_followers(engine, &ctx, &dario.user_id).await.unwrap();
    assert_eq!(followers.len(), 2);
    assert!(followers.iter().all(|v| v.following_id == dario.user_id));
    let followings = Following::list_followings(engine, &ctx, &dario.user_id).await.unwrap();
    assert_eq!(followings, [Following::new(&dario.user_id, &elena.user_id)]);
    Following::find(engine, &ctx, &fabio.user_id, &dario.user_id)
        .await
        .expect("Could not find the following");
    let affected = Following::unfollow(engine, &ctx, &fabio.user_id, &dario.user_id)
        .await
        .unwrap();
    assert_eq!(affected.rows_affected, 1);
    let result = Following::find(engine, &ctx, &fabio.user_id, &dario.user_id).await;
    assert!(matches!(result, Err(Error::NotFound(..))), "{result:?}");

    // Blocks
    engine
        .insert(&ctx, &BlockedUser::new(&dario.user_id, &fabio.user_id))
        .await
        .expect("Could not block");
    assert!(BlockedUser::is_blocked(engine, &ctx, &dario.user_id, &fabio.user_id).await.unwrap());
    assert!(!BlockedUser::is_blocked(engine, &ctx, &fabio.user_id, &dario.user_id).await.unwrap());
    let blocked = BlockedUser::list_blocked(engine, &ctx, &dario.user_id).await.unwrap();
    assert_eq!(blocked, [BlockedUser::new(&dario.user_id, &fabio.user_id)]);
    BlockedUser::unblock(engine, &ctx, &dario.user_id, &fabio.user_id)
        .await
        .unwrap();
    assert!(!BlockedUser::is_blocked(engine, &ctx, &dario.user_id, &fabio.user_id).await.unwrap());

    // Flags
    let flagged = FlaggedAccount::flag(engine, &ctx, &fabio.user_id, Some("spam"))
        .await
        .expect("Could not flag the account");
    assert_eq!(flagged.flag_count, 1);
    let flagged = FlaggedAccount::flag(engine, &ctx, &fabio.user_id, None)
        .await
        .expect("Could not flag the account again");
    assert_eq!(flagged.flag_count, 2);
    assert_eq!(flagged.reason.as_deref(), Some("spam"));
    let found = FlaggedAccount::find(engine, &ctx, &fabio.user_id).await.unwrap();
    assert_eq!(found, flagged);
    assert!(!found.is_suspended);
    assert_eq!(User::find(engine, &ctx, &fabio.user_id).await.unwrap().flagged, 2);
    let result = FlaggedAccount::find(engine, &ctx, &elena.user_id).await;
    assert!(matches!(result, Err(Error::NotFound(..))), "{result:?}");
}
